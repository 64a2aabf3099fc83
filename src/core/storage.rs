//! Client-side key/value storage, the durable home of the cart and the
//! currency preference.

use anyhow::Result;

/// Storage key holding the JSON array of cart lines.
pub const CART_KEY: &str = "cart";
/// Storage key holding the selected currency code.
pub const CURRENCY_KEY: &str = "currency";

pub trait ClientStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}
