pub mod cart;
pub mod currency;
pub mod setup;
pub mod ui;
