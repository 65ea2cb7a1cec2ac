//! YouTube adapter: the video-host single-store platform (§3, §4.1).

use async_trait::async_trait;
use domain::errors::ProviderError;
use domain::services::providers::{classify_http_status, SingleStoreProvider};
use reqwest::Client;

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

pub struct YouTubeProvider {
    client: Client,
}

impl YouTubeProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SingleStoreProvider for YouTubeProvider {
    async fn fetch(&self, access_token: &str) -> Result<serde_json::Value, ProviderError> {
        let channel: serde_json::Value = self
            .client
            .get(format!("{BASE_URL}/channels?part=contentDetails&mine=true"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let uploads_playlist_id = channel
            .pointer("/items/0/contentDetails/relatedPlaylists/uploads")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::ParseError("missing uploads playlist".to_string()))?;

        let response = self
            .client
            .get(format!(
                "{BASE_URL}/playlistItems?part=snippet,contentDetails&maxResults=50&playlistId={uploads_playlist_id}"
            ))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_http_status(response.status().as_u16(), None));
        }

        let videos: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(serde_json::json!({ "channel": channel, "videos": videos }))
    }
}
