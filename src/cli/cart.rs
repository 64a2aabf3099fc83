use super::ui;
use crate::core::cart::Product;
use crate::session::Session;
use anyhow::{Result, bail};
use comfy_table::Cell;
use rust_decimal::Decimal;

/// Renders the cart lines and order summary in the session's currency.
pub fn render(session: &Session) -> String {
    let cart = session.cart();
    if cart.is_empty() {
        return ui::style_text("Your cart is empty", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Product"),
        ui::header_cell("Size"),
        ui::header_cell("Qty"),
        ui::header_cell("Price"),
        ui::header_cell("Line total"),
    ]);

    for item in cart.items() {
        let size = item.size.as_deref().map_or_else(ui::na_cell, Cell::new);
        table.add_row(vec![
            Cell::new(&item.product_id),
            size,
            ui::number_cell(item.quantity.to_string()),
            ui::number_cell(session.format(item.unit_price)),
            ui::number_cell(session.format(item.line_total())),
        ]);
    }

    let summary = cart.summary();
    let shipping = if summary.free_shipping() {
        "FREE".to_string()
    } else {
        session.format(summary.shipping)
    };

    let mut output = format!(
        "Cart ({} item(s))\n\n",
        ui::style_text(&cart.count().to_string(), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nSubtotal: {}\nShipping: {}\n{} {}",
        session.format(summary.subtotal),
        shipping,
        ui::style_text(&format!("Total ({}):", session.currency()), ui::StyleType::TotalLabel),
        ui::style_text(&session.format(summary.total), ui::StyleType::TotalValue)
    ));
    output
}

pub fn add(
    session: &mut Session,
    product_id: &str,
    price: Decimal,
    quantity: u32,
    size: Option<&str>,
) -> Result<()> {
    if price.is_sign_negative() {
        bail!("Price cannot be negative");
    }
    session
        .cart_mut()
        .add(&Product::new(product_id, price), quantity, size)?;
    tracing::info!(product = %product_id, quantity, "Added to cart");
    Ok(())
}
