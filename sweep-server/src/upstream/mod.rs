//! Upstream market-data sources
//!
//! The read routes depend on three narrow traits so tests can swap in
//! in-process fakes. The HTTP implementations live in [`thirdweb`] and
//! [`coingecko`].

pub mod coingecko;
pub mod thirdweb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use coingecko::CoinGeckoClient;
pub use thirdweb::ThirdwebClient;

/// Base mainnet
pub const BASE_CHAIN_ID: u64 = 8453;

/// Balances at or below this (in whole tokens) are dropped
pub const MIN_BALANCE: f64 = 0.0001;

/// Page size used when walking every page of a wallet
pub const FETCH_ALL_PAGE_SIZE: u32 = 50;

/// Pause between pages when walking every page of a wallet
pub const FETCH_ALL_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Image returned when no source has one for a token
pub const UNKNOWN_TOKEN_IMAGE: &str =
    "https://assets.coingecko.com/coins/images/1/thumb/bitcoin.png";

const DEFAULT_DECIMALS: u32 = 18;

const KNOWN_ICONS: &[(&str, &str)] = &[
    ("WETH", "https://assets.coingecko.com/coins/images/2518/thumb/weth.png"),
    ("USDC", "https://assets.coingecko.com/coins/images/6319/thumb/USD_Coin_icon.png"),
    ("USDbC", "https://assets.coingecko.com/coins/images/6319/thumb/USD_Coin_icon.png"),
    ("DAI", "https://assets.coingecko.com/coins/images/9956/thumb/4943.png"),
    ("USDT", "https://assets.coingecko.com/coins/images/325/thumb/Tether.png"),
    ("AERO", "https://assets.coingecko.com/coins/images/31745/thumb/token.png"),
];

/// Errors raised while talking to upstream APIs
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Server configuration error")]
    MissingCredentials,

    #[error("Authentication failed. Please check your client ID.")]
    Unauthorized,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Failed to fetch data from {service} (status {status})")]
    Status { service: &'static str, status: u16 },

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Price block attached to a wallet token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    #[serde(default)]
    pub price_usd: Option<f64>,
}

/// Token as returned by the wallet-balance API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawToken {
    pub token_address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Integer balance in base units
    pub balance: String,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub price_data: Option<PriceData>,
}

/// One page of wallet tokens
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletPage {
    pub tokens: Vec<RawToken>,
    pub has_more: bool,
}

/// Token row returned by the balances route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedToken {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub balance: String,
    pub decimals: u32,
    pub logo: String,
    /// USD value of the holding
    pub value: f64,
    pub chain_id: u64,
    pub price_usd: f64,
    pub balance_formatted: f64,
}

/// Wallet token balances
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn wallet_tokens(
        &self,
        wallet: &str,
        page: u32,
        limit: u32,
    ) -> Result<WalletPage, UpstreamError>;
}

/// Token market prices in USD
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current USD price; `0.0` when the source does not list the token
    async fn token_price(&self, token: &str) -> Result<f64, UpstreamError>;
}

/// Token images
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Image URL for a token, `None` when the source has no entry for it
    async fn token_image(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<Option<String>, UpstreamError>;
}

/// Convert a raw token, dropping dust balances and unparseable rows
pub fn process_token(raw: &RawToken) -> Option<ProcessedToken> {
    let decimals = raw.decimals.unwrap_or(DEFAULT_DECIMALS);
    let base_units: f64 = raw.balance.trim().parse().ok()?;
    let balance_formatted = base_units / 10f64.powi(decimals as i32);

    if !(balance_formatted > MIN_BALANCE) {
        return None;
    }

    let price_usd = raw
        .price_data
        .as_ref()
        .and_then(|p| p.price_usd)
        .unwrap_or(0.0);
    let symbol = raw.symbol.clone().unwrap_or_else(|| "UNKNOWN".to_string());

    Some(ProcessedToken {
        address: raw.token_address.clone(),
        logo: token_icon(raw.logo.as_deref(), &symbol),
        name: raw.name.clone().unwrap_or_else(|| "Unknown Token".to_string()),
        symbol,
        balance: raw.balance.clone(),
        decimals,
        value: balance_formatted * price_usd,
        chain_id: BASE_CHAIN_ID,
        price_usd,
        balance_formatted,
    })
}

/// Process a page of raw tokens and sort by USD value, highest first
pub fn process_tokens(raw: &[RawToken]) -> Vec<ProcessedToken> {
    let mut tokens: Vec<ProcessedToken> = raw.iter().filter_map(process_token).collect();
    tokens.sort_by(|a, b| b.value.total_cmp(&a.value));
    tokens
}

/// Logo URL from the API, else a well-known icon, else empty
fn token_icon(logo: Option<&str>, symbol: &str) -> String {
    if let Some(logo) = logo.filter(|l| l.starts_with("http")) {
        return logo.to_string();
    }

    KNOWN_ICONS
        .iter()
        .find(|(known, _)| *known == symbol)
        .map(|(_, url)| url.to_string())
        .unwrap_or_default()
}

/// Walk every page of a wallet until a short page comes back
pub async fn fetch_all_tokens(
    source: &dyn BalanceSource,
    wallet: &str,
    page_delay: Duration,
) -> Result<Vec<RawToken>, UpstreamError> {
    let mut all = Vec::new();
    let mut page = 0;

    loop {
        let batch = source.wallet_tokens(wallet, page, FETCH_ALL_PAGE_SIZE).await?;
        let fetched = batch.tokens.len();
        all.extend(batch.tokens);
        debug!("Fetched page {} for {} ({} tokens)", page, wallet, fetched);

        if fetched < FETCH_ALL_PAGE_SIZE as usize {
            break;
        }
        page += 1;
        tokio::time::sleep(page_delay).await;
    }

    Ok(all)
}
