use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::Platform;

/// Bring-your-own OAuth client for a `(profile, platform)` pair, overriding
/// the system-wide credentials for that platform when present (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformCredential {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub platform: Platform,
    pub client_id: String,
    pub client_secret_encrypted: String,
    pub is_verified: bool,
}
