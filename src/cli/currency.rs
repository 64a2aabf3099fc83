use super::ui;
use crate::core::currency::{BASE_CURRENCY, Currency};
use crate::session::Session;
use anyhow::Result;
use comfy_table::Cell;

/// Renders the active rate table with the selected currency marked.
pub fn render(session: &Session) -> String {
    let rates = session.rates();
    let selected = session.currency();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(""),
        ui::header_cell("Currency"),
        ui::header_cell("Symbol"),
        ui::header_cell(&format!("Rate per {}", BASE_CURRENCY.code())),
    ]);

    for currency in Currency::ALL {
        let marker = if currency == selected { "*" } else { "" };
        let rate = rates
            .get(currency)
            .map_or_else(ui::na_cell, |r| ui::number_cell(r.normalize().to_string()));
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(currency.code()),
            Cell::new(currency.symbol()),
            rate,
        ]);
    }

    format!(
        "{}\n\n{}\n\nSelected: {} ({})",
        ui::style_text("Exchange rates", ui::StyleType::Title),
        table,
        ui::style_text(selected.code(), ui::StyleType::TotalValue),
        selected.symbol()
    )
}

pub fn set(session: &mut Session, code: &str) -> Result<()> {
    let currency: Currency = code.parse()?;
    session.set_currency(currency)?;
    tracing::info!(%currency, "Currency selected");
    Ok(())
}
