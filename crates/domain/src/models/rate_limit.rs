use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-account fetch-governance state (§4.3). One row per account.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimitRecord {
    pub account_id: Uuid,
    /// Quota left in the current window, if the platform reports one.
    pub remaining: Option<i64>,
    /// When the window refills.
    pub reset_at: Option<DateTime<Utc>>,
    pub consecutive_failures: i64,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Fetches are suppressed while `now < circuit_open_until`.
    pub circuit_open_until: Option<DateTime<Utc>>,
}

impl RateLimitRecord {
    pub fn new(account_id: Uuid) -> Self {
        Self {
            account_id,
            ..Default::default()
        }
    }
}
