//! Thirdweb wallet-token API

use super::{BalanceSource, RawToken, UpstreamError, WalletPage, BASE_CHAIN_ID};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::error;

pub const THIRDWEB_API_URL: &str = "https://api.thirdweb.com";

#[derive(Debug, Default, Deserialize)]
struct TokensEnvelope {
    #[serde(default)]
    result: Option<TokensResult>,
}

#[derive(Debug, Default, Deserialize)]
struct TokensResult {
    #[serde(default)]
    tokens: Vec<RawToken>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    has_more: bool,
}

/// Wallet balances on Base from the Thirdweb API
#[derive(Debug, Clone)]
pub struct ThirdwebClient {
    http: Client,
    base_url: String,
    client_id: Option<String>,
}

impl ThirdwebClient {
    pub fn new(client_id: Option<String>) -> Self {
        Self::with_base_url(THIRDWEB_API_URL, client_id)
    }

    /// Point the client at another host (staging, local mock)
    pub fn with_base_url(base_url: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.filter(|id| !id.is_empty()),
        }
    }
}

#[async_trait]
impl BalanceSource for ThirdwebClient {
    async fn wallet_tokens(
        &self,
        wallet: &str,
        page: u32,
        limit: u32,
    ) -> Result<WalletPage, UpstreamError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(UpstreamError::MissingCredentials)?;

        let url = format!("{}/v1/wallets/{}/tokens", self.base_url, wallet);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("chainId", BASE_CHAIN_ID.to_string()),
                ("limit", limit.to_string()),
                ("page", page.to_string()),
            ])
            .header("x-client-id", client_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Thirdweb API call failed with status {}: {}", status, body);

            return Err(match status {
                StatusCode::UNAUTHORIZED => UpstreamError::Unauthorized,
                StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited,
                _ => UpstreamError::Status {
                    service: "Thirdweb",
                    status: status.as_u16(),
                },
            });
        }

        let envelope: TokensEnvelope = response.json().await?;
        let result = envelope.result.unwrap_or_default();

        Ok(WalletPage {
            has_more: result.pagination.is_some_and(|p| p.has_more),
            tokens: result.tokens,
        })
    }
}
