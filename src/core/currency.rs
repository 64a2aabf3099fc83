//! Display currencies, rate tables and the rate provider abstraction

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Currency all catalogue and cart prices are stored in.
pub const BASE_CURRENCY: Currency = Currency::Usd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Rub,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Rub];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Rub => "RUB",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Rub => "₽",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "RUB" => Ok(Currency::Rub),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

/// Conversion factors from the base currency to each display currency.
///
/// Tables are only ever replaced as a whole; there is no way to patch a single
/// rate into an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<Currency, Decimal>,
}

impl RateTable {
    /// Static table used whenever the upstream service cannot be reached.
    pub fn fallback() -> Self {
        Self {
            rates: HashMap::from([
                (Currency::Usd, Decimal::ONE),
                (Currency::Eur, Decimal::new(92, 2)),
                (Currency::Gbp, Decimal::new(79, 2)),
                (Currency::Rub, Decimal::new(925, 1)),
            ]),
        }
    }

    /// Builds a table from raw upstream codes, keeping only supported
    /// currencies with a positive factor.
    pub fn from_codes<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut rates = HashMap::new();
        for (code, factor) in raw {
            let code = code.as_ref();
            match code.parse::<Currency>() {
                Ok(currency) if factor > Decimal::ZERO => {
                    rates.insert(currency, factor);
                }
                Ok(_) => debug!("Dropping non-positive rate for {}: {}", code, factor),
                Err(_) => debug!("Dropping unsupported currency code: {}", code),
            }
        }
        Self { rates }
    }

    pub fn get(&self, currency: Currency) -> Option<Decimal> {
        self.rates.get(&currency).copied()
    }

    /// Looks up a rate by raw code; unknown codes have no rate.
    pub fn rate_for(&self, code: &str) -> Option<Decimal> {
        code.parse::<Currency>().ok().and_then(|c| self.get(c))
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Factor turning an amount in `from` into `to`.
    pub fn cross_rate(&self, from: Currency, to: Currency) -> Option<Decimal> {
        self.get(to)?.checked_div(self.get(from)?)
    }

    /// The same table quoted against `base` instead of the base currency.
    /// `None` when the table has no rate for `base`.
    pub fn rebase(&self, base: Currency) -> Option<RateTable> {
        let base_rate = self.get(base)?;
        let rates = self
            .rates
            .iter()
            .filter_map(|(currency, rate)| rate.checked_div(base_rate).map(|r| (*currency, r)))
            .collect();
        Some(Self { rates })
    }

    /// Rates in the fixed currency order, for display.
    pub fn entries(&self) -> Vec<(Currency, Decimal)> {
        Currency::ALL
            .iter()
            .filter_map(|c| self.get(*c).map(|r| (*c, r)))
            .collect()
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable>;
}
