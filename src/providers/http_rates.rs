use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::config::RatesProviderConfig;
use crate::core::currency::{RateProvider, RateTable};

const RETRY_DELAY_MS: u64 = 250;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Rates from any endpoint answering `{ "rates": { "<code>": <factor> } }`,
/// such as the storefront API or the upstream exchange-rate service.
pub struct HttpRateProvider {
    url: String,
    api_key: Option<String>,
    retries: usize,
    client: reqwest::Client,
}

impl HttpRateProvider {
    pub fn new(url: &str) -> Self {
        HttpRateProvider {
            url: url.to_string(),
            api_key: None,
            retries: 0,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &RatesProviderConfig) -> Self {
        HttpRateProvider {
            api_key: config.api_key.clone(),
            retries: config.retries,
            ..Self::new(&config.url)
        }
    }

    async fn request(&self) -> Result<String> {
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, self.url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for URL: {}",
                response.status(),
                self.url
            ));
        }

        Ok(response.text().await?)
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, Decimal>,
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    #[instrument(name = "RatesFetch", skip(self), fields(url = %self.url))]
    async fn fetch_rates(&self) -> Result<RateTable> {
        debug!("Requesting exchange rates");
        let text = with_retry(|| self.request(), self.retries, RETRY_DELAY_MS).await?;

        let data: RatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse rates response: {}", e))?;

        let table = RateTable::from_codes(data.rates);
        if table.is_empty() {
            return Err(anyhow!("No supported currency rates in response"));
        }
        debug!("Received {} usable rate(s)", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/currency/rates"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider_for(server: &MockServer) -> HttpRateProvider {
        HttpRateProvider::new(&format!("{}/api/currency/rates", server.uri()))
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let body = r#"{
            "success": true,
            "base": "USD",
            "rates": { "USD": 1, "EUR": 0.91, "GBP": 0.78, "RUB": 90.1, "JPY": 151.2 }
        }"#;
        let server = create_mock_server(200, body).await;

        let table = provider_for(&server).fetch_rates().await.unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(Currency::Eur), Some(dec!(0.91)));
        assert_eq!(table.get(Currency::Rub), Some(dec!(90.1)));
    }

    #[tokio::test]
    async fn test_api_key_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(header("apikey", "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"rates": {"EUR": 0.9}}"#),
            )
            .mount(&server)
            .await;

        let provider = HttpRateProvider::from_config(&RatesProviderConfig {
            url: format!("{}/latest", server.uri()),
            api_key: Some("secret".to_string()),
            retries: 0,
        });
        let table = provider.fetch_rates().await.unwrap();
        assert_eq!(table.get(Currency::Eur), Some(dec!(0.9)));
    }

    #[tokio::test]
    async fn test_rates_api_error_response() {
        let server = create_mock_server(500, "").await;

        let result = provider_for(&server).fetch_rates().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("HTTP error: 500 Internal Server Error")
        );
    }

    #[tokio::test]
    async fn test_rates_malformed_response() {
        let server = create_mock_server(200, r#"{"error": "quota"}"#).await;

        let result = provider_for(&server).fetch_rates().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse rates response")
        );
    }

    #[tokio::test]
    async fn test_rates_without_supported_codes() {
        let server = create_mock_server(200, r#"{"rates": {"JPY": 150}}"#).await;

        let result = provider_for(&server).fetch_rates().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No supported currency rates in response"
        );
    }
}
