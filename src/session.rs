//! A shopper's session: cart, selected currency and exchange rates, owned by
//! one explicitly constructed value instead of ambient globals.

use crate::cart_store::CartStore;
use crate::core::currency::{Currency, RateTable};
use crate::core::price;
use crate::core::storage::{CURRENCY_KEY, ClientStorage};
use crate::rates::RateSource;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Session {
    cart: CartStore,
    currency: Currency,
    rates: RateSource,
    storage: Arc<dyn ClientStorage>,
}

impl Session {
    /// Restores the saved cart and currency preference, then performs the
    /// startup rate fetch.
    pub async fn open(
        storage: Arc<dyn ClientStorage>,
        rates: RateSource,
        default_currency: Currency,
    ) -> Self {
        let session = Self::restore(storage, rates, default_currency);
        session.rates.fetch_rates().await;
        info!(
            currency = %session.currency,
            items = session.cart.count(),
            "Session opened"
        );
        session
    }

    /// Like [`Session::open`] without the rate fetch; the fallback table is
    /// used until [`Session::refresh_rates`] runs.
    pub fn restore(
        storage: Arc<dyn ClientStorage>,
        rates: RateSource,
        default_currency: Currency,
    ) -> Self {
        let cart = CartStore::load(Arc::clone(&storage));
        let currency = load_currency(storage.as_ref()).unwrap_or(default_currency);
        Self {
            cart,
            currency,
            rates,
            storage,
        }
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn set_currency(&mut self, currency: Currency) -> Result<()> {
        self.storage
            .set_item(CURRENCY_KEY, currency.code())
            .context("Failed to save currency preference")?;
        self.currency = currency;
        debug!(%currency, "Currency preference changed");
        Ok(())
    }

    pub fn rates(&self) -> Arc<RateTable> {
        self.rates.current()
    }

    pub fn rate_source(&self) -> &RateSource {
        &self.rates
    }

    pub async fn refresh_rates(&self) -> Arc<RateTable> {
        self.rates.fetch_rates().await
    }

    /// Base-currency amount in the selected currency.
    pub fn convert(&self, amount: Decimal) -> Decimal {
        price::convert(amount, self.currency.code(), &self.rates.current())
    }

    pub fn format(&self, amount: Decimal) -> String {
        price::format(amount, self.currency.code(), &self.rates.current())
    }

    /// Ends the session. Everything is already persisted on each mutation, so
    /// this only hands back the storage for reuse.
    pub fn close(self) -> Arc<dyn ClientStorage> {
        debug!("Session closed");
        self.storage
    }
}

fn load_currency(storage: &dyn ClientStorage) -> Option<Currency> {
    let raw = match storage.get_item(CURRENCY_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "Failed to read currency preference");
            return None;
        }
    };
    match raw.parse() {
        Ok(currency) => Some(currency),
        Err(e) => {
            warn!(error = %e, "Ignoring saved currency preference");
            None
        }
    }
}
