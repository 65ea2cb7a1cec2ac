use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of external platforms this core knows how to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    GitHub,
    Reddit,
    Twitter,
    Mastodon,
    YouTube,
    Linear,
}

impl Platform {
    /// The path segment used in store ids and log fields for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GitHub => "github",
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
            Platform::Mastodon => "mastodon",
            Platform::YouTube => "youtube",
            Platform::Linear => "linear",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "github" => Some(Platform::GitHub),
            "reddit" => Some(Platform::Reddit),
            "twitter" => Some(Platform::Twitter),
            "mastodon" => Some(Platform::Mastodon),
            "youtube" => Some(Platform::YouTube),
            "linear" => Some(Platform::Linear),
            _ => None,
        }
    }

    /// Platforms whose raw pulls are split across a meta store plus one or
    /// more entity-collection stores (§4.5 "multi-store platforms").
    pub fn is_multi_store(&self) -> bool {
        matches!(self, Platform::GitHub | Platform::Reddit | Platform::Twitter)
    }

    /// Minimum days between successful fetches this platform mandates, if
    /// any (§4.3). `None` means the rate-limit/circuit-breaker state alone
    /// governs cadence.
    pub fn minimum_fetch_interval_days(&self) -> Option<i64> {
        match self {
            Platform::Twitter => Some(1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An external-platform connection attached to a [`crate::models::Profile`].
///
/// Invariant: `(profile_id, platform, external_user_id)` is unique.
/// Invariant: `access_token_encrypted`/`refresh_token_encrypted` are always
/// the encryption output, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub platform: Platform,
    pub external_user_id: String,
    pub external_handle: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-account display preference, keyed by an opaque string key, value is
/// any JSON-encodable blob (e.g. the list of hidden repos for an account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSetting {
    pub account_id: Uuid,
    pub key: String,
    pub value: serde_json::Value,
}
