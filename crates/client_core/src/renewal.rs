use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::error::ApiError;
use tracing::{debug, warn};

use crate::{error::ClientError, session::TokenPair};

#[async_trait]
pub trait CredentialRenewer: Send + Sync {
    async fn renew(&self, token: &str, refresh_token: &str) -> Result<TokenPair, ClientError>;
}

#[derive(Debug, Serialize)]
struct RenewRequest<'a> {
    token: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RenewResponse {
    token: String,
    refresh_token: String,
    #[serde(default)]
    expired_in: Option<i64>,
}

/// Exchanges a refresh token at `POST {base}/token/renew`.
pub struct HttpRenewer {
    http: Client,
    base_url: String,
}

impl HttpRenewer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CredentialRenewer for HttpRenewer {
    async fn renew(&self, token: &str, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let response = self
            .http
            .post(format!("{}/token/renew", self.base_url))
            .json(&RenewRequest {
                token,
                refresh_token,
            })
            .send()
            .await
            .map_err(|err| ClientError::Renewal(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let api_error = ApiError::from_response(status.as_u16(), &body);
            if api_error.is_auth_failure() {
                warn!(%status, "renew: refresh token rejected");
            }
            return Err(ClientError::RenewalRejected(api_error));
        }

        let body: RenewResponse = response
            .json()
            .await
            .map_err(|err| ClientError::Renewal(format!("invalid renew response: {err}")))?;
        debug!(expired_in = ?body.expired_in, "renew: token issued");

        Ok(TokenPair {
            token: body.token,
            refresh_token: body.refresh_token,
        })
    }
}
