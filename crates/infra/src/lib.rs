//! # Infrastructure Layer
//!
//! This crate provides all infrastructure implementations for the aggregator.
//! It implements the interfaces defined in the domain layer, following the
//! Dependency Inversion Principle.
//!
//! ## Architecture
//!
//! The infrastructure is split into two main façades:
//!
//! - `ServerInfra`: Contains all services including those with sensitive
//!   credentials (database, vault key, OAuth client secrets)
//! - `ClientInfra`: Contains only client-safe services without any secrets
//!
//! ## Modules
//!
//! - `db`: SQLite/SQLx database implementations of domain repository traits
//! - `store`: Versioned Store implementation over the same pool
//! - `vault`: AES-256-GCM credential-at-rest encryption
//! - `identity`: external identity-service verification
//! - `providers`: one HTTP adapter per platform in the closed set

pub mod db;
pub mod identity;
pub mod providers;
pub mod store;
pub mod sync;
pub mod vault;

pub use db::{DbRepo, MIGRATOR};
pub use identity::HttpIdentityClient;
pub use store::SqlStore;
pub use sync::{InfraAccountSync, InfraTimelineRegenerator};
pub use vault::AesGcmVault;

use domain::errors::DomainError;
use providers::{
    GitHubProvider, LinearProvider, MastodonProvider, OAuthTokenRefresher, RedditProvider, TwitterProvider,
    YouTubeProvider,
};

/// Server-side infrastructure containing sensitive services
///
/// This struct aggregates all infrastructure services needed by the API
/// server, including those that hold sensitive credentials like the
/// database connection and the vault's encryption key.
///
/// # Security Warning
///
/// This struct should NEVER be used in client/CLI code as it would embed
/// secrets into the client binary. Use `ClientInfra` instead for client
/// applications.
pub struct ServerInfra {
    /// Database repository providing all repository-trait operations.
    pub db: DbRepo,
    /// Versioned Store over the same connection pool as `db`.
    pub store: SqlStore,
    /// Credential-at-rest encryption.
    pub vault: AesGcmVault,
    /// External identity-service client (§6.2).
    pub identity: HttpIdentityClient,
    http_client: reqwest::Client,
    github_client_id: Option<String>,
    github_client_secret: Option<String>,
    reddit_client_id: Option<String>,
    reddit_client_secret: Option<String>,
    twitter_client_id: Option<String>,
    twitter_client_secret: Option<String>,
}

impl ServerInfra {
    /// Creates a new ServerInfra instance with all infrastructure services initialized
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if:
    /// - Database connection fails
    /// - HTTP client initialization fails
    /// - `encryption_key` is missing or malformed
    pub async fn new(cfg: &common::Config) -> Result<Self, DomainError> {
        let db = DbRepo::new(&cfg.database_url)
            .await
            .map_err(|e| DomainError::Internal(format!("Database initialization failed: {e}")))?;
        db.run_migrations()
            .await
            .map_err(|e| DomainError::Internal(format!("Migration failed: {e}")))?;

        let store = SqlStore::new(db.pool().clone());

        let encryption_key = cfg
            .encryption_key
            .as_deref()
            .ok_or_else(|| DomainError::Internal("encryption_key is not configured".to_string()))?;
        let vault = AesGcmVault::from_env_value(encryption_key).map_err(DomainError::from)?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.api_timeout_seconds))
            .build()
            .map_err(|e| DomainError::Internal(format!("HTTP client initialization failed: {e}")))?;

        let identity = HttpIdentityClient::new(http_client.clone(), cfg.devpad_url.clone());

        Ok(Self {
            db,
            store,
            vault,
            identity,
            http_client,
            github_client_id: cfg.github_client_id.clone(),
            github_client_secret: cfg.github_client_secret.clone(),
            reddit_client_id: cfg.reddit_client_id.clone(),
            reddit_client_secret: cfg.reddit_client_secret.clone(),
            twitter_client_id: cfg.twitter_client_id.clone(),
            twitter_client_secret: cfg.twitter_client_secret.clone(),
        })
    }

    pub fn github_provider(&self, repos: Vec<String>) -> GitHubProvider {
        GitHubProvider::new(self.http_client.clone(), repos)
    }

    pub fn reddit_provider(&self) -> RedditProvider {
        RedditProvider::new(self.http_client.clone())
    }

    pub fn twitter_provider(&self) -> TwitterProvider {
        TwitterProvider::new(self.http_client.clone())
    }

    pub fn mastodon_provider(&self, instance_base_url: String) -> MastodonProvider {
        MastodonProvider::new(self.http_client.clone(), instance_base_url)
    }

    pub fn youtube_provider(&self) -> YouTubeProvider {
        YouTubeProvider::new(self.http_client.clone())
    }

    pub fn linear_provider(&self) -> LinearProvider {
        LinearProvider::new(self.http_client.clone())
    }

    /// A bring-your-own `(client_id, client_secret)` pair overrides the
    /// system-wide one for its platform (§4.8).
    pub fn github_token_refresher(&self, client_id: &str, client_secret: &str) -> OAuthTokenRefresher {
        OAuthTokenRefresher::new(
            self.http_client.clone(),
            "https://github.com/login/oauth/access_token".to_string(),
            client_id.to_string(),
            client_secret.to_string(),
        )
    }

    pub fn reddit_token_refresher(&self, client_id: &str, client_secret: &str) -> OAuthTokenRefresher {
        OAuthTokenRefresher::new(
            self.http_client.clone(),
            "https://www.reddit.com/api/v1/access_token".to_string(),
            client_id.to_string(),
            client_secret.to_string(),
        )
    }

    pub fn twitter_token_refresher(&self, client_id: &str, client_secret: &str) -> OAuthTokenRefresher {
        OAuthTokenRefresher::new(
            self.http_client.clone(),
            "https://api.twitter.com/2/oauth2/token".to_string(),
            client_id.to_string(),
            client_secret.to_string(),
        )
    }

    pub fn system_github_credentials(&self) -> Option<(&str, &str)> {
        Some((self.github_client_id.as_deref()?, self.github_client_secret.as_deref()?))
    }

    pub fn system_reddit_credentials(&self) -> Option<(&str, &str)> {
        Some((self.reddit_client_id.as_deref()?, self.reddit_client_secret.as_deref()?))
    }

    pub fn system_twitter_credentials(&self) -> Option<(&str, &str)> {
        Some((self.twitter_client_id.as_deref()?, self.twitter_client_secret.as_deref()?))
    }
}

/// Client-safe infrastructure without sensitive credentials
///
/// Reserved for CLI/desktop surfaces that talk to the API over HTTP rather
/// than holding server secrets directly; currently unused since
/// `aggregator-cli` operates against a local `ServerInfra` (§9.1), kept for
/// a future remote-mode CLI.
pub struct ClientInfra {
    http_client: reqwest::Client,
}

impl ClientInfra {
    pub fn new(cfg: &common::Config) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.api_timeout_seconds))
            .build()
            .map_err(|e| DomainError::Internal(format!("HTTP client initialization failed: {e}")))?;

        Ok(Self { http_client })
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}
