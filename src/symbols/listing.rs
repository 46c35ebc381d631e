//! `SymbolSource` implementations that read a CoinMarketCap style listing, either over HTTP or
//! from a file on disk.
//!
//! The expected shape is:
//! ```json
//! { "data": [ { "id": 1, "name": "Bitcoin", "symbol": "BTC", "website_slug": "bitcoin" } ] }
//! ```

use crate::model::Currency;
use crate::symbols::SymbolSource;
use crate::{utils, Config, Result};
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct ListingResponse {
    data: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    symbol: String,
}

fn parse_listing(json: &str) -> Result<Vec<Currency>> {
    let response: ListingResponse =
        serde_json::from_str(json).context("Unable to parse the currency listing")?;
    Ok(response
        .data
        .into_iter()
        .map(|entry| Currency::with_name(entry.symbol, entry.name))
        .collect())
}

/// Fetches the listing over HTTP. Each request is bounded by a timeout and failed requests are
/// retried a fixed number of times before giving up.
#[derive(Debug, Clone)]
pub struct HttpListing {
    url: Url,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpListing {
    pub fn new(url: Url, timeout: Duration, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            url,
            timeout,
            max_retries,
            retry_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.listing_url().clone(),
            config.request_timeout(),
            config.max_retries(),
            config.retry_delay(),
        )
    }

    async fn fetch_once(&self, client: &reqwest::Client) -> Result<String> {
        let response = client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Request to {} returned status {status}", self.url);
        }

        response
            .text()
            .await
            .with_context(|| format!("Unable to read the response body from {}", self.url))
    }
}

#[async_trait::async_trait]
impl SymbolSource for HttpListing {
    async fn listing(&self) -> Result<Vec<Currency>> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Unable to create the HTTP client")?;

        let attempts = self.max_retries + 1;
        let mut last_error = anyhow!("No request was made to {}", self.url);
        for attempt in 1..=attempts {
            debug!("Fetching currency listing from {} ({attempt}/{attempts})", self.url);
            match self.fetch_once(&client).await {
                Ok(body) => return parse_listing(&body),
                Err(e) => {
                    warn!("Attempt {attempt}/{attempts} to fetch the currency listing failed: {e:#}");
                    last_error = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(last_error.context(format!(
            "Unable to fetch the currency listing after {attempts} attempts"
        )))
    }
}

/// Reads the listing from a JSON file, e.g. a saved copy of the HTTP response.
#[derive(Debug, Clone)]
pub struct FileListing {
    path: PathBuf,
}

impl FileListing {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SymbolSource for FileListing {
    async fn listing(&self) -> Result<Vec<Currency>> {
        let content = utils::read(&self.path).await?;
        parse_listing(&content)
            .with_context(|| format!("Bad currency listing in {}", self.path.display()))
    }
}
