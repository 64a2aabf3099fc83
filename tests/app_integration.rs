use std::fs;
use std::path::Path;
use std::sync::Arc;

use rust_decimal_macros::dec;
use stylehub::cart_store::CartStore;
use stylehub::core::currency::{Currency, RateTable};
use stylehub::core::storage::{CURRENCY_KEY, ClientStorage};
use stylehub::rates::RateSource;
use stylehub::session::Session;
use stylehub::store::KeyValueStore;
use stylehub::{AppCommand, CartCommand, CurrencyCommand};
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_rates_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/currency/rates"))
            .and(header("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

const RATES_RESPONSE: &str =
    r#"{"success": true, "base": "USD", "rates": {"USD": 1, "EUR": 0.5, "GBP": 0.25, "RUB": 100}}"#;

fn write_config(dir: &Path, rates_url: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config = format!(
        r#"
currency: "USD"
data_path: "{}"
providers:
  rates:
    url: "{rates_url}"
    api_key: "test-key"
    retries: 0
"#,
        dir.join("data").display()
    );
    fs::write(&config_path, config).unwrap();
    config_path.to_string_lossy().to_string()
}

fn open_storage(dir: &Path) -> Arc<dyn ClientStorage> {
    let store = KeyValueStore::open(&dir.join("data")).unwrap();
    Arc::new(store.client_storage().unwrap())
}

#[test_log::test(tokio::test)]
async fn test_cart_commands_persist_between_runs() {
    let mock_server = test_utils::create_rates_server(200, RATES_RESPONSE).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        temp_dir.path(),
        &format!("{}/api/currency/rates", mock_server.uri()),
    );

    let add = |product_id: &str, quantity: u32, size: Option<&str>| {
        AppCommand::Cart(CartCommand::Add {
            product_id: product_id.to_string(),
            price: dec!(20),
            quantity,
            size: size.map(str::to_string),
        })
    };

    stylehub::run_command(add("shirt", 2, Some("M")), Some(&config_path))
        .await
        .unwrap();
    stylehub::run_command(add("shirt", 1, Some("M")), Some(&config_path))
        .await
        .unwrap();
    stylehub::run_command(add("hat", 1, None), Some(&config_path))
        .await
        .unwrap();
    stylehub::run_command(
        AppCommand::Cart(CartCommand::Remove {
            product_id: "hat".to_string(),
            size: None,
        }),
        Some(&config_path),
    )
    .await
    .unwrap();
    stylehub::run_command(AppCommand::Cart(CartCommand::Show), Some(&config_path))
        .await
        .unwrap();

    let cart = CartStore::load(open_storage(temp_dir.path()));
    info!(items = ?cart.items(), "Reloaded cart");
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product_id, "shirt");
    assert_eq!(cart.items()[0].size.as_deref(), Some("M"));
    assert_eq!(cart.count(), 3);
    assert_eq!(cart.total(), dec!(60));
}

#[test_log::test(tokio::test)]
async fn test_currency_preference_persists_and_formats() {
    let mock_server = test_utils::create_rates_server(200, RATES_RESPONSE).await;
    let temp_dir = TempDir::new().unwrap();
    let rates_url = format!("{}/api/currency/rates", mock_server.uri());
    let config_path = write_config(temp_dir.path(), &rates_url);

    stylehub::run_command(
        AppCommand::Currency(CurrencyCommand::Set {
            code: "eur".to_string(),
        }),
        Some(&config_path),
    )
    .await
    .unwrap();
    stylehub::run_command(AppCommand::Currency(CurrencyCommand::Show), Some(&config_path))
        .await
        .unwrap();

    let storage = open_storage(temp_dir.path());
    assert_eq!(
        storage.get_item(CURRENCY_KEY).unwrap().as_deref(),
        Some("EUR")
    );

    let provider = stylehub::providers::http_rates::HttpRateProvider::from_config(
        &stylehub::core::config::RatesProviderConfig {
            url: rates_url,
            api_key: Some("test-key".to_string()),
            retries: 0,
        },
    );
    let session = Session::open(storage, RateSource::new(Arc::new(provider)), Currency::Usd).await;
    assert_eq!(session.currency(), Currency::Eur);
    assert_eq!(session.format(dec!(100)), "€50.00");
}

#[test_log::test(tokio::test)]
async fn test_rate_failure_uses_fallback_table() {
    let mock_server = test_utils::create_rates_server(500, "boom").await;
    let temp_dir = TempDir::new().unwrap();
    let rates_url = format!("{}/api/currency/rates", mock_server.uri());
    let config_path = write_config(temp_dir.path(), &rates_url);

    // Display commands still succeed on fallback rates
    stylehub::run_command(AppCommand::Cart(CartCommand::Show), Some(&config_path))
        .await
        .unwrap();

    let provider = stylehub::providers::http_rates::HttpRateProvider::new(&rates_url);
    let source = RateSource::new(Arc::new(provider));
    let table = source.fetch_rates().await;
    assert_eq!(*table, RateTable::fallback());

    let storage: Arc<dyn ClientStorage> = Arc::new(stylehub::store::memory::MemoryStorage::new());
    let session = Session::restore(storage, source, Currency::Gbp);
    assert_eq!(session.format(dec!(10)), "£7.90");
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let result = stylehub::run_command(
        AppCommand::Cart(CartCommand::Show),
        Some("/nonexistent/stylehub/config.yaml"),
    )
    .await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
}
