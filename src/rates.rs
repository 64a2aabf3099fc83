//! The session's exchange-rate table and how it gets refreshed.

use crate::core::currency::{RateProvider, RateTable};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Holds the most recently committed [`RateTable`].
///
/// Starts out with [`RateTable::fallback`] and is replaced wholesale by every
/// [`RateSource::fetch_rates`] call. Readers never wait on a fetch; they see
/// whichever table was committed last.
pub struct RateSource {
    provider: Arc<dyn RateProvider>,
    tx: watch::Sender<Arc<RateTable>>,
}

impl RateSource {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(RateTable::fallback()));
        Self { provider, tx }
    }

    /// Fetches a fresh table, committing the fallback table when the provider
    /// fails. Returns the committed table.
    pub async fn fetch_rates(&self) -> Arc<RateTable> {
        let table = match self.provider.fetch_rates().await {
            Ok(table) => {
                debug!("Committing {} fetched rate(s)", table.len());
                table
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch exchange rates, using fallback rates");
                RateTable::fallback()
            }
        };
        let table = Arc::new(table);
        self.tx.send_replace(Arc::clone(&table));
        table
    }

    pub fn current(&self) -> Arc<RateTable> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RateTable>> {
        self.tx.subscribe()
    }
}
