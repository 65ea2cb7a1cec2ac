//! # Repository Traits
//!
//! Data access interfaces implemented by the infrastructure layer.
//! Following the Repository pattern, these traits abstract all data
//! persistence operations.
//!
//! ## Design Principles
//!
//! - All traits are async and use `async_trait` for compatibility
//! - Methods return `Result<T, DomainError>` for consistent error handling
//! - Traits require `Send + Sync` for use in async contexts
//! - No implementation details or database-specific types

use crate::errors::DomainError;
use crate::models::{
    Account, AccountSetting, PlatformCredential, Profile, ProfileFilter, RateLimitRecord, User,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for the owning principal. Users are created/updated by the
/// identity verification flow (§6.2) and are never deleted by this core.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    async fn find_by_external_identity_id(
        &self,
        external_identity_id: &str,
    ) -> Result<Option<User>, DomainError>;
    async fn create(&self, user: &User) -> Result<User, DomainError>;
    async fn update(&self, user: &User) -> Result<User, DomainError>;
}

/// Repository for profiles. A profile is owned by one user and cascades
/// to its accounts, filters, and credentials on deletion.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, DomainError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Profile>, DomainError>;
    async fn find_by_owner(&self, owner_user_id: Uuid) -> Result<Vec<Profile>, DomainError>;
    async fn create(&self, profile: &Profile) -> Result<Profile, DomainError>;
    async fn update(&self, profile: &Profile) -> Result<Profile, DomainError>;
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

/// Repository for platform connections.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError>;
    async fn find_by_profile(&self, profile_id: Uuid) -> Result<Vec<Account>, DomainError>;
    /// All active accounts across all profiles, for cron fan-out (§4.5, §5).
    async fn find_all_active(&self) -> Result<Vec<Account>, DomainError>;
    async fn create(&self, account: &Account) -> Result<Account, DomainError>;
    async fn update(&self, account: &Account) -> Result<Account, DomainError>;
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

#[async_trait]
pub trait AccountSettingRepository: Send + Sync {
    async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<AccountSetting>, DomainError>;
    async fn upsert(&self, setting: &AccountSetting) -> Result<AccountSetting, DomainError>;
}

/// Repository for rate-limit/circuit-breaker state (§4.3). One record per
/// account, created lazily on first fetch.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    async fn find_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<RateLimitRecord>, DomainError>;
    async fn upsert(&self, record: &RateLimitRecord) -> Result<RateLimitRecord, DomainError>;
}

/// Repository for profile-scoped timeline filters (§4.7).
#[async_trait]
pub trait ProfileFilterRepository: Send + Sync {
    async fn find_by_profile(&self, profile_id: Uuid) -> Result<Vec<ProfileFilter>, DomainError>;
    async fn create(&self, filter: &ProfileFilter) -> Result<ProfileFilter, DomainError>;
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

/// Repository for bring-your-own OAuth client credentials (§4.8).
#[async_trait]
pub trait PlatformCredentialRepository: Send + Sync {
    async fn find_by_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<PlatformCredential>, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlatformCredential>, DomainError>;
    async fn upsert(
        &self,
        credential: &PlatformCredential,
    ) -> Result<PlatformCredential, DomainError>;
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}
