//! Core business logic abstractions

pub mod cart;
pub mod config;
pub mod currency;
pub mod log;
pub mod price;
pub mod storage;

// Re-export main types for cleaner imports
pub use cart::{Cart, LineItem, OrderSummary, Product};
pub use currency::{Currency, RateProvider, RateTable};
pub use storage::ClientStorage;
