//! Platform Provider contract (C1, §4.1).
//!
//! Infrastructure provides one implementation per platform over HTTP. This
//! module only defines the shape; it never performs I/O itself.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::snapshot::{PlatformMeta, RepoCommits, RepoPullRequests};

/// What a multi-store platform (code-host, social-A, microblog) returns
/// from one fetch: a meta summary plus zero or more entity collections
/// (§3 "Typed payloads", §4.5 step 4).
#[derive(Debug, Clone)]
pub struct MultiStoreFetchResult {
    pub meta: PlatformMeta,
    pub commits: Vec<RepoCommits>,
    pub pull_requests: Vec<RepoPullRequests>,
    pub posts: Vec<crate::models::snapshot::Post>,
    pub comments: Vec<crate::models::snapshot::Comment>,
    pub tweets: Vec<crate::models::snapshot::Tweet>,
}

impl Default for MultiStoreFetchResult {
    fn default() -> Self {
        Self {
            meta: PlatformMeta::GitHub {
                username: String::new(),
                repos: Vec::new(),
            },
            commits: Vec::new(),
            pull_requests: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            tweets: Vec::new(),
        }
    }
}

/// Contract for a platform that splits its pull into meta + entity
/// collections (code-host, social-A, microblog).
#[async_trait]
pub trait MultiStoreProvider: Send + Sync {
    async fn fetch(&self, access_token: &str) -> Result<MultiStoreFetchResult, ProviderError>;

    /// Used by the microblog provider when the token only grants
    /// app-level access and fetches must be scoped to a known handle
    /// (§4.1).
    async fn fetch_for_username(
        &self,
        access_token: &str,
        handle: &str,
    ) -> Result<MultiStoreFetchResult, ProviderError> {
        let _ = handle;
        self.fetch(access_token).await
    }

    /// Page size this provider uses, bounded by upstream quota (§4.1).
    fn page_size(&self) -> usize;
}

/// Contract for a platform with a single raw collection (social-B,
/// video-host, task-tracker). The payload is passed through as-received.
#[async_trait]
pub trait SingleStoreProvider: Send + Sync {
    async fn fetch(&self, access_token: &str) -> Result<serde_json::Value, ProviderError>;
}

/// Maps an upstream HTTP status to the closed [`ProviderError`] taxonomy
/// (§4.1). `retry_after_secs` is honored when the status is 429.
pub fn classify_http_status(status: u16, retry_after_secs: Option<i64>) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthExpired(format!("status {status}")),
        429 => ProviderError::RateLimited { retry_after_secs },
        400..=499 => ProviderError::BadRequest(format!("status {status}")),
        _ => ProviderError::ApiError { status },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses_per_taxonomy() {
        assert!(matches!(
            classify_http_status(401, None),
            ProviderError::AuthExpired(_)
        ));
        assert!(matches!(
            classify_http_status(429, Some(30)),
            ProviderError::RateLimited {
                retry_after_secs: Some(30)
            }
        ));
        assert!(matches!(
            classify_http_status(404, None),
            ProviderError::BadRequest(_)
        ));
        assert!(matches!(
            classify_http_status(503, None),
            ProviderError::ApiError { status: 503 }
        ));
    }
}
