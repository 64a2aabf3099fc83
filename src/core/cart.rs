//! Cart line items and the pure cart model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orders with a subtotal above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
/// Flat shipping fee charged at or below the threshold.
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// The part of a catalogue product the cart cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub price: Decimal,
}

impl Product {
    pub fn new(id: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            price,
        }
    }
}

/// Identity of a cart line: the same product in two sizes is two lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey<'a> {
    pub product_id: &'a str,
    pub size: Option<&'a str>,
}

impl<'a> LineKey<'a> {
    pub fn new(product_id: &'a str, size: Option<&'a str>) -> Self {
        Self { product_id, size }
    }
}

/// Anything stored as a line in a cart, client or server side.
pub trait CartLine {
    fn key(&self) -> LineKey<'_>;
    fn quantity(&self) -> u32;
    fn set_quantity(&mut self, quantity: u32);
}

/// Adds `line` to `lines`, bumping the quantity of an existing line with the
/// same key instead of appending a duplicate.
///
/// Merged quantities saturate at `u32::MAX`. Callers that must report the
/// overflow check the headroom before merging.
pub fn merge_line<L: CartLine>(lines: &mut Vec<L>, line: L) {
    let existing = lines.iter_mut().find(|l| l.key() == line.key());
    match existing {
        Some(current) => {
            let quantity = current.quantity().saturating_add(line.quantity());
            current.set_quantity(quantity);
        }
        None => lines.push(line),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub quantity: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl CartLine for LineItem {
    fn key(&self) -> LineKey<'_> {
        LineKey::new(&self.product_id, self.size.as_deref())
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING_FEE
        };
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    pub fn free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}

/// Ordered cart contents. Every line has a quantity of at least one and no
/// two lines share a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from stored lines, folding duplicate keys together and
    /// dropping lines with a zero quantity.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items.into_iter().filter(|i| i.quantity > 0) {
            merge_line(&mut cart.items, item);
        }
        cart
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, product_id: &str, size: Option<&str>) -> Option<&LineItem> {
        let key = LineKey::new(product_id, size);
        self.items.iter().find(|i| i.key() == key)
    }

    pub fn add(&mut self, product: &Product, quantity: u32, size: Option<&str>) {
        if quantity == 0 {
            return;
        }
        let line = LineItem {
            product_id: product.id.clone(),
            unit_price: product.price,
            size: size.map(str::to_string),
            quantity,
        };
        merge_line(&mut self.items, line);
    }

    /// Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &str, size: Option<&str>) -> bool {
        let key = LineKey::new(product_id, size);
        let before = self.items.len();
        self.items.retain(|i| i.key() != key);
        self.items.len() != before
    }

    /// A zero quantity removes the line. Returns whether a line matched.
    pub fn set_quantity(&mut self, product_id: &str, size: Option<&str>, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id, size);
        }
        let key = LineKey::new(product_id, size);
        match self.items.iter_mut().find(|i| i.key() == key) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary::for_subtotal(self.total())
    }
}
