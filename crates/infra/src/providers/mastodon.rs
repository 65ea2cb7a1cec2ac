//! Mastodon adapter: a social-B single-store platform (§3, §4.1). The
//! wire shape is passed through as-received rather than typed, per
//! [`domain::models::snapshot::SnapshotPayload::Raw`].

use async_trait::async_trait;
use domain::errors::ProviderError;
use domain::services::providers::{classify_http_status, SingleStoreProvider};
use reqwest::Client;

pub struct MastodonProvider {
    client: Client,
    instance_base_url: String,
}

impl MastodonProvider {
    pub fn new(client: Client, instance_base_url: String) -> Self {
        Self {
            client,
            instance_base_url,
        }
    }
}

#[async_trait]
impl SingleStoreProvider for MastodonProvider {
    async fn fetch(&self, access_token: &str) -> Result<serde_json::Value, ProviderError> {
        let account: serde_json::Value = self
            .client
            .get(format!("{}/api/v1/accounts/verify_credentials", self.instance_base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let account_id = account
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::ParseError("missing account id".to_string()))?;

        let response = self
            .client
            .get(format!(
                "{}/api/v1/accounts/{account_id}/statuses?limit=40",
                self.instance_base_url
            ))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_http_status(response.status().as_u16(), None));
        }

        let statuses: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(serde_json::json!({ "account": account, "statuses": statuses }))
    }
}
