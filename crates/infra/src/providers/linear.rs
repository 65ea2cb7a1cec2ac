//! Linear adapter: the task-tracker single-store platform (§3, §4.1).
//! Linear's API is GraphQL; this adapter issues one query and passes the
//! response body through as-received.

use async_trait::async_trait;
use domain::errors::ProviderError;
use domain::services::providers::{classify_http_status, SingleStoreProvider};
use reqwest::Client;

const BASE_URL: &str = "https://api.linear.app/graphql";

const ASSIGNED_ISSUES_QUERY: &str = r#"
query {
  viewer {
    id
    name
    assignedIssues(first: 100) {
      nodes {
        id
        identifier
        title
        url
        state { name }
        updatedAt
        team { key name }
      }
    }
  }
}
"#;

pub struct LinearProvider {
    client: Client,
}

impl LinearProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SingleStoreProvider for LinearProvider {
    async fn fetch(&self, access_token: &str) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "query": ASSIGNED_ISSUES_QUERY }))
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_http_status(response.status().as_u16(), None));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(errors) = body.get("errors") {
            return Err(ProviderError::ParseError(format!("linear graphql errors: {errors}")));
        }

        Ok(body)
    }
}
