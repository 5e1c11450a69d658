//! CoinGecko price and image lookups

use super::{ImageSource, PriceSource, UpstreamError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko platform id for Base
pub const BASE_PLATFORM: &str = "base";

#[derive(Debug, Deserialize)]
struct ContractInfo {
    #[serde(default)]
    image: Option<ContractImage>,
}

#[derive(Debug, Deserialize)]
struct ContractImage {
    #[serde(default)]
    large: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinGeckoClient {
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn token_price(&self, token: &str) -> Result<f64, UpstreamError> {
        let url = format!("{}/simple/token_price/{}", self.base_url, BASE_PLATFORM);
        let response = self
            .http
            .get(&url)
            .query(&[("contract_addresses", token), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                service: "CoinGecko",
                status: response.status().as_u16(),
            });
        }

        let prices: HashMap<String, HashMap<String, f64>> = response.json().await?;
        let price = prices
            .get(&token.to_lowercase())
            .and_then(|quote| quote.get("usd"))
            .copied()
            .unwrap_or(0.0);

        debug!("CoinGecko price for {}: {}", token, price);
        Ok(price)
    }
}

#[async_trait]
impl ImageSource for CoinGeckoClient {
    async fn token_image(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<Option<String>, UpstreamError> {
        let url = format!("{}/coins/{}/contract/{}", self.base_url, chain, address);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            warn!("No CoinGecko entry for {} on {} (status {})", address, chain, response.status());
            return Ok(None);
        }

        let info: ContractInfo = response.json().await?;
        Ok(info.image.and_then(|image| image.large))
    }
}
