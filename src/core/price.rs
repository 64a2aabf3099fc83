//! Base-currency to display-currency conversion and formatting

use super::currency::{Currency, RateTable};
use rust_decimal::{Decimal, RoundingStrategy};

/// Symbol used when a currency code is not recognised.
pub const DEFAULT_SYMBOL: &str = "$";

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a base-currency amount for display.
///
/// When the table has no rate for `target` the amount is returned unconverted.
pub fn convert(amount: Decimal, target: &str, rates: &RateTable) -> Decimal {
    match rates.rate_for(target) {
        Some(rate) => round_money(amount * rate),
        None => amount,
    }
}

/// Converts between any two currencies in the table, rounded like
/// [`convert`]. `None` when either rate is missing.
pub fn convert_between(amount: Decimal, from: Currency, to: Currency, rates: &RateTable) -> Option<Decimal> {
    rates
        .cross_rate(from, to)
        .map(|rate| round_money(amount * rate))
}

/// Converted amount with the currency symbol in front, e.g. `€92.00`.
pub fn format(amount: Decimal, target: &str, rates: &RateTable) -> String {
    let symbol = target
        .parse::<Currency>()
        .map_or(DEFAULT_SYMBOL, |c| c.symbol());
    let converted = convert(amount, target, rates);
    format!("{symbol}{converted:.2}")
}
