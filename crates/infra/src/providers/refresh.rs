//! Generic OAuth2 refresh-token exchange (§4.5 "one-shot auth-refresh-and-retry").
//! Every platform in the closed set speaks the same
//! `grant_type=refresh_token` form-encoded exchange, so one adapter
//! covers all of them.

use async_trait::async_trait;
use chrono::Utc;
use domain::errors::ProviderError;
use domain::services::account_processor::{RefreshedToken, TokenRefresher};
use reqwest::Client;
use serde::Deserialize;

pub struct OAuthTokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl OAuthTokenRefresher {
    pub fn new(client: Client, token_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[async_trait]
impl TokenRefresher for OAuthTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, ProviderError> {
        let body = serde_urlencoded::to_string([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .map_err(|e| ProviderError::BadRequest(e.to_string()))?;

        let response = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::AuthExpired(format!(
                "refresh rejected with status {}",
                response.status()
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let expires_at = parsed
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Ok(RefreshedToken {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at,
        })
    }
}
