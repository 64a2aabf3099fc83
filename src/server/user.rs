use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cart::{CartLine, LineKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCartItem {
    pub product_id: String,
    pub quantity: u32,
    pub size: Option<String>,
}

impl CartLine for ServerCartItem {
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

/// The stored user document. Only the fields the cart endpoints touch are
/// modelled; credentials live with the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub cart: Vec<ServerCartItem>,
    /// Bumped by the repository on every successful save.
    #[serde(default)]
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(id: &str, username: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_lowercase(),
            cart: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }
}
