use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named view owned by a [`crate::models::User`]. Cascades to its
/// accounts on deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    /// URL-safe, unique per owner.
    pub slug: String,
    pub display_name: String,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
