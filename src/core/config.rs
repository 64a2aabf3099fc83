use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

use super::currency::Currency;

pub const DEFAULT_RATES_URL: &str = "http://localhost:5000/api/currency/rates";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
/// Exchange-rate service proxied by the server unless configured otherwise.
pub const DEFAULT_UPSTREAM_RATES_URL: &str = "https://api.apilayer.com/fixer/latest?base=USD";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesProviderConfig {
    pub url: String,
    /// Sent as the `apikey` header when set.
    pub api_key: Option<String>,
    #[serde(default = "default_retries")]
    pub retries: usize,
}

fn default_retries() -> usize {
    1
}

impl Default for RatesProviderConfig {
    fn default() -> Self {
        RatesProviderConfig {
            url: DEFAULT_RATES_URL.to_string(),
            api_key: None,
            retries: default_retries(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub rates: RatesProviderConfig,
}

/// A user account known to the cart server, reachable with a static bearer token.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SeedUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upstream used by the currency endpoints. Must not point back at `bind`.
    #[serde(default = "default_upstream_rates")]
    pub upstream_rates: RatesProviderConfig,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_upstream_rates() -> RatesProviderConfig {
    RatesProviderConfig {
        url: DEFAULT_UPSTREAM_RATES_URL.to_string(),
        ..RatesProviderConfig::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            upstream_rates: default_upstream_rates(),
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Currency preselected when no preference has been stored yet.
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults when
    /// no config file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "stylehub", "stylehub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("com", "stylehub", "stylehub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
