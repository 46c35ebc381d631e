//! Configuration file handling for deltaconv.
//!
//! The configuration file is optional. It is read from the path given with `--config`, or else
//! from `$HOME/.deltaconv/config.json` when that file exists. Every setting has a default.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

const APP_NAME: &str = "deltaconv";
const CONFIG_VERSION: u8 = 1;
const DELTACONV_DIR: &str = ".deltaconv";
const CONFIG_JSON: &str = "config.json";
const LISTING_URL: &str = "https://api.coinmarketcap.com/v2/listings/";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;

/// The `Config` object represents the configuration of the app, i.e. the contents of the config
/// file, if any, with defaults filled in.
#[derive(Debug, Clone)]
pub struct Config {
    config_path: Option<PathBuf>,
    config_file: ConfigFile,
    listing_url: Url,
}

impl Config {
    /// Loads the config file at `path`, which must exist. Without a `path` the default location
    /// is used if a file is there, otherwise the built-in defaults apply.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.is_file() {
                    bail!("The config file is missing '{}'", p.display())
                }
                Some(p.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.is_file()),
        };

        let config_file = match &config_path {
            Some(p) => {
                debug!("Loading config from {}", p.display());
                ConfigFile::load(p).await?
            }
            None => {
                debug!("No config file, using defaults");
                ConfigFile::default()
            }
        };
        Self::new(config_path, config_file)
    }

    fn new(config_path: Option<PathBuf>, config_file: ConfigFile) -> Result<Self> {
        let listing_url = Url::parse(&config_file.listing_url).with_context(|| {
            format!(
                "Invalid listing_url in config file: '{}'",
                config_file.listing_url
            )
        })?;
        Ok(Self {
            config_path,
            config_file,
            listing_url,
        })
    }

    /// `$HOME/.deltaconv/config.json`, or `None` if there is no home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DELTACONV_DIR).join(CONFIG_JSON))
    }

    /// The file the configuration was loaded from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Where the currency listing is fetched from.
    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.request_timeout_secs)
    }

    pub fn max_retries(&self) -> u32 {
        self.config_file.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.config_file.retry_delay_ms)
    }

    /// The offline currency listing, if configured. A relative path is resolved against the
    /// directory of the config file.
    pub fn symbols_file(&self) -> Option<PathBuf> {
        let p = self.config_file.symbols_file.as_ref()?;
        if p.is_absolute() {
            return Some(p.clone());
        }
        let base = self.config_path.as_deref().and_then(Path::parent);
        Some(match base {
            Some(dir) => dir.join(p),
            None => p.clone(),
        })
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "deltaconv",
///   "config_version": 1,
///   "listing_url": "https://api.coinmarketcap.com/v2/listings/",
///   "request_timeout_secs": 10,
///   "max_retries": 3,
///   "retry_delay_ms": 500,
///   "symbols_file": "listings.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "deltaconv"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// URL of the CoinMarketCap style currency listing
    #[serde(default = "default_listing_url")]
    listing_url: String,

    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// How often a failed listing request is repeated
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    retry_delay_ms: u64,

    /// A saved listing to use instead of fetching it (optional, relative to config.json or
    /// absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbols_file: Option<PathBuf>,
}

fn default_listing_url() -> String {
    LISTING_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY_MS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            listing_url: default_listing_url(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            max_retries: MAX_RETRIES,
            retry_delay_ms: RETRY_DELAY_MS,
            symbols_file: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: &Path) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        // Validate app_name
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    #[cfg(test)]
    async fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}
