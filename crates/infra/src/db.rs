//! # Database Infrastructure Module
//!
//! This module provides SQLite/SQLx implementations of all domain repository traits.
//! It handles database connections, migrations, and data access operations.
//!
//! ## Architecture
//!
//! - Uses SQLx for async database operations
//! - Implements all repository traits defined in the domain layer
//! - Manages database migrations via SQLx migrate macro
//! - Currently supports SQLite with plans for PostgreSQL support

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::errors::DomainError;
use domain::models::account::Platform;
use domain::models::filter::{FilterKey, FilterKind};
use domain::models::{
    Account, AccountSetting, PlatformCredential, Profile, ProfileFilter, RateLimitRecord, User,
};
use domain::repositories::{
    AccountRepository, AccountSettingRepository, PlatformCredentialRepository, ProfileFilterRepository,
    ProfileRepository, RateLimitRepository, UserRepository,
};
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqliteConnectOptions;
pub use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Static migrator instance for database schema management
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Database repository implementing all domain repository traits
///
/// This struct provides a unified interface for all database operations,
/// implementing the repository pattern to abstract data access from business logic.
#[derive(Clone)]
pub struct DbRepo {
    pool: SqlitePool,
}

impl DbRepo {
    /// Creates a new database repository with connection pool
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection URL (e.g., "sqlite:./aggregator.db")
    ///
    /// # Notes
    ///
    /// - Automatically appends `?mode=rwc` if not present (read-write-create)
    /// - Creates database file if it doesn't exist
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let db_url = if database_url.starts_with("sqlite:") {
            if !database_url.contains("?mode=") {
                format!("{database_url}?mode=rwc")
            } else {
                database_url.to_string()
            }
        } else {
            return Err(sqlx::Error::Configuration(
                "Only SQLite databases are supported".into(),
            ));
        };

        let connect_options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(connect_options).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    ///
    /// This is exposed for advanced use cases where direct pool access is needed.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs all pending database migrations
    ///
    /// This should be called during application startup to ensure
    /// the database schema is up to date.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn db_err(operation: &str, err: sqlx::Error) -> DomainError {
    DomainError::Internal(format!("{operation}: {err}"))
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Internal(format!("bad timestamp {raw}: {e}")))
}

fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>, DomainError> {
    raw.map(|s| parse_ts(&s)).transpose()
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, DomainError> {
    Ok(User {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        external_identity_id: row.get("external_identity_id"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

#[async_trait]
impl UserRepository for DbRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_by_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_external_identity_id(
        &self,
        external_identity_id: &str,
    ) -> Result<Option<User>, DomainError> {
        let row = sqlx::query("SELECT * FROM users WHERE external_identity_id = ?")
            .bind(external_identity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_by_external_identity_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        sqlx::query(
            "INSERT INTO users (id, external_identity_id, display_name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.external_identity_id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("create_user", e))?;
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        sqlx::query(
            "UPDATE users SET display_name = ?, email = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.updated_at.to_rfc3339())
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("update_user", e))?;
        Ok(user.clone())
    }
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, DomainError> {
    Ok(Profile {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        owner_user_id: Uuid::parse_str(row.get::<String, _>("owner_user_id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        slug: row.get("slug"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        theme: row.get("theme"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

#[async_trait]
impl ProfileRepository for DbRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, DomainError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_profile_by_id", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Profile>, DomainError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_profile_by_slug", e))?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn find_by_owner(&self, owner_user_id: Uuid) -> Result<Vec<Profile>, DomainError> {
        let rows = sqlx::query("SELECT * FROM profiles WHERE owner_user_id = ? ORDER BY created_at")
            .bind(owner_user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("find_profiles_by_owner", e))?;
        rows.iter().map(profile_from_row).collect()
    }

    async fn create(&self, profile: &Profile) -> Result<Profile, DomainError> {
        sqlx::query(
            "INSERT INTO profiles (id, owner_user_id, slug, display_name, description, theme, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(profile.id.to_string())
        .bind(profile.owner_user_id.to_string())
        .bind(&profile.slug)
        .bind(&profile.display_name)
        .bind(&profile.description)
        .bind(&profile.theme)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("create_profile", e))?;
        Ok(profile.clone())
    }

    async fn update(&self, profile: &Profile) -> Result<Profile, DomainError> {
        sqlx::query(
            "UPDATE profiles SET display_name = ?, description = ?, theme = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&profile.display_name)
        .bind(&profile.description)
        .bind(&profile.theme)
        .bind(profile.updated_at.to_rfc3339())
        .bind(profile.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("update_profile", e))?;
        Ok(profile.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("delete_profile", e))?;
        Ok(())
    }
}

fn account_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Account, DomainError> {
    let platform_raw: String = row.get("platform");
    let platform = Platform::parse(&platform_raw)
        .ok_or_else(|| DomainError::Internal(format!("unknown platform: {platform_raw}")))?;
    Ok(Account {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        profile_id: Uuid::parse_str(row.get::<String, _>("profile_id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        platform,
        external_user_id: row.get("external_user_id"),
        external_handle: row.get("external_handle"),
        access_token_encrypted: row.get("access_token_encrypted"),
        refresh_token_encrypted: row.get("refresh_token_encrypted"),
        token_expires_at: parse_opt_ts(row.get("token_expires_at"))?,
        is_active: row.get::<i64, _>("is_active") != 0,
        last_fetched_at: parse_opt_ts(row.get("last_fetched_at"))?,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

#[async_trait]
impl AccountRepository for DbRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_account_by_id", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_profile(&self, profile_id: Uuid) -> Result<Vec<Account>, DomainError> {
        let rows = sqlx::query("SELECT * FROM accounts WHERE profile_id = ? ORDER BY created_at")
            .bind(profile_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("find_accounts_by_profile", e))?;
        rows.iter().map(account_from_row).collect()
    }

    async fn find_all_active(&self) -> Result<Vec<Account>, DomainError> {
        let rows = sqlx::query("SELECT * FROM accounts WHERE is_active = 1 ORDER BY profile_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("find_all_active_accounts", e))?;
        rows.iter().map(account_from_row).collect()
    }

    async fn create(&self, account: &Account) -> Result<Account, DomainError> {
        sqlx::query(
            "INSERT INTO accounts (id, profile_id, platform, external_user_id, external_handle, access_token_encrypted, refresh_token_encrypted, token_expires_at, is_active, last_fetched_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account.id.to_string())
        .bind(account.profile_id.to_string())
        .bind(account.platform.as_str())
        .bind(&account.external_user_id)
        .bind(&account.external_handle)
        .bind(&account.access_token_encrypted)
        .bind(&account.refresh_token_encrypted)
        .bind(account.token_expires_at.map(|t| t.to_rfc3339()))
        .bind(account.is_active as i64)
        .bind(account.last_fetched_at.map(|t| t.to_rfc3339()))
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("create_account", e))?;
        Ok(account.clone())
    }

    async fn update(&self, account: &Account) -> Result<Account, DomainError> {
        sqlx::query(
            "UPDATE accounts SET external_handle = ?, access_token_encrypted = ?, refresh_token_encrypted = ?, token_expires_at = ?, is_active = ?, last_fetched_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&account.external_handle)
        .bind(&account.access_token_encrypted)
        .bind(&account.refresh_token_encrypted)
        .bind(account.token_expires_at.map(|t| t.to_rfc3339()))
        .bind(account.is_active as i64)
        .bind(account.last_fetched_at.map(|t| t.to_rfc3339()))
        .bind(account.updated_at.to_rfc3339())
        .bind(account.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("update_account", e))?;
        Ok(account.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("delete_account", e))?;
        Ok(())
    }
}

#[async_trait]
impl AccountSettingRepository for DbRepo {
    async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<AccountSetting>, DomainError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM account_settings WHERE account_id = ?")
                .bind(account_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_err("find_account_settings", e))?;

        rows.into_iter()
            .map(|(key, value)| {
                Ok(AccountSetting {
                    account_id,
                    key,
                    value: serde_json::from_str(&value)
                        .map_err(|e| DomainError::Internal(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn upsert(&self, setting: &AccountSetting) -> Result<AccountSetting, DomainError> {
        let value = serde_json::to_string(&setting.value).map_err(|e| DomainError::Internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO account_settings (account_id, key, value) VALUES (?, ?, ?) \
             ON CONFLICT (account_id, key) DO UPDATE SET value = excluded.value",
        )
        .bind(setting.account_id.to_string())
        .bind(&setting.key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("upsert_account_setting", e))?;
        Ok(setting.clone())
    }
}

fn rate_limit_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RateLimitRecord, DomainError> {
    Ok(RateLimitRecord {
        account_id: Uuid::parse_str(row.get::<String, _>("account_id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        remaining: row.get("remaining"),
        reset_at: parse_opt_ts(row.get("reset_at"))?,
        consecutive_failures: row.get("consecutive_failures"),
        last_failure_at: parse_opt_ts(row.get("last_failure_at"))?,
        circuit_open_until: parse_opt_ts(row.get("circuit_open_until"))?,
    })
}

#[async_trait]
impl RateLimitRepository for DbRepo {
    async fn find_by_account(&self, account_id: Uuid) -> Result<Option<RateLimitRecord>, DomainError> {
        let row = sqlx::query("SELECT * FROM rate_limit_records WHERE account_id = ?")
            .bind(account_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_rate_limit", e))?;
        row.as_ref().map(rate_limit_from_row).transpose()
    }

    async fn upsert(&self, record: &RateLimitRecord) -> Result<RateLimitRecord, DomainError> {
        sqlx::query(
            "INSERT INTO rate_limit_records (account_id, remaining, reset_at, consecutive_failures, last_failure_at, circuit_open_until) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (account_id) DO UPDATE SET \
               remaining = excluded.remaining, \
               reset_at = excluded.reset_at, \
               consecutive_failures = excluded.consecutive_failures, \
               last_failure_at = excluded.last_failure_at, \
               circuit_open_until = excluded.circuit_open_until",
        )
        .bind(record.account_id.to_string())
        .bind(record.remaining)
        .bind(record.reset_at.map(|t| t.to_rfc3339()))
        .bind(record.consecutive_failures)
        .bind(record.last_failure_at.map(|t| t.to_rfc3339()))
        .bind(record.circuit_open_until.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("upsert_rate_limit", e))?;
        Ok(record.clone())
    }
}

fn profile_filter_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProfileFilter, DomainError> {
    let kind_raw: String = row.get("kind");
    let key_raw: String = row.get("key");
    Ok(ProfileFilter {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        profile_id: Uuid::parse_str(row.get::<String, _>("profile_id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        account_id: Uuid::parse_str(row.get::<String, _>("account_id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        kind: match kind_raw.as_str() {
            "include" => FilterKind::Include,
            "exclude" => FilterKind::Exclude,
            other => return Err(DomainError::Internal(format!("unknown filter kind: {other}"))),
        },
        key: FilterKey::parse(&key_raw)
            .ok_or_else(|| DomainError::Internal(format!("unknown filter key: {key_raw}")))?,
        value: row.get("value"),
    })
}

#[async_trait]
impl ProfileFilterRepository for DbRepo {
    async fn find_by_profile(&self, profile_id: Uuid) -> Result<Vec<ProfileFilter>, DomainError> {
        let rows = sqlx::query("SELECT * FROM profile_filters WHERE profile_id = ?")
            .bind(profile_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("find_profile_filters", e))?;
        rows.iter().map(profile_filter_from_row).collect()
    }

    async fn create(&self, filter: &ProfileFilter) -> Result<ProfileFilter, DomainError> {
        let kind = match filter.kind {
            FilterKind::Include => "include",
            FilterKind::Exclude => "exclude",
        };
        sqlx::query(
            "INSERT INTO profile_filters (id, profile_id, account_id, kind, key, value) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(filter.id.to_string())
        .bind(filter.profile_id.to_string())
        .bind(filter.account_id.to_string())
        .bind(kind)
        .bind(filter.key.as_str())
        .bind(&filter.value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("create_profile_filter", e))?;
        Ok(filter.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM profile_filters WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("delete_profile_filter", e))?;
        Ok(())
    }
}

fn platform_credential_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PlatformCredential, DomainError> {
    let platform_raw: String = row.get("platform");
    Ok(PlatformCredential {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        profile_id: Uuid::parse_str(row.get::<String, _>("profile_id").as_str())
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        platform: Platform::parse(&platform_raw)
            .ok_or_else(|| DomainError::Internal(format!("unknown platform: {platform_raw}")))?,
        client_id: row.get("client_id"),
        client_secret_encrypted: row.get("client_secret_encrypted"),
        is_verified: row.get::<i64, _>("is_verified") != 0,
    })
}

#[async_trait]
impl PlatformCredentialRepository for DbRepo {
    async fn find_by_profile(&self, profile_id: Uuid) -> Result<Vec<PlatformCredential>, DomainError> {
        let rows = sqlx::query("SELECT * FROM platform_credentials WHERE profile_id = ?")
            .bind(profile_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("find_platform_credentials", e))?;
        rows.iter().map(platform_credential_from_row).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PlatformCredential>, DomainError> {
        let row = sqlx::query("SELECT * FROM platform_credentials WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_platform_credential_by_id", e))?;
        row.as_ref().map(platform_credential_from_row).transpose()
    }

    async fn upsert(&self, credential: &PlatformCredential) -> Result<PlatformCredential, DomainError> {
        sqlx::query(
            "INSERT INTO platform_credentials (id, profile_id, platform, client_id, client_secret_encrypted, is_verified) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (profile_id, platform) DO UPDATE SET \
               client_id = excluded.client_id, \
               client_secret_encrypted = excluded.client_secret_encrypted, \
               is_verified = excluded.is_verified",
        )
        .bind(credential.id.to_string())
        .bind(credential.profile_id.to_string())
        .bind(credential.platform.as_str())
        .bind(&credential.client_id)
        .bind(&credential.client_secret_encrypted)
        .bind(credential.is_verified as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("upsert_platform_credential", e))?;
        Ok(credential.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM platform_credentials WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("delete_platform_credential", e))?;
        Ok(())
    }
}

pub async fn init_db(database_url: &str) -> Result<SqlitePool, Box<dyn std::error::Error>> {
    let db_repo = DbRepo::new(database_url).await?;
    db_repo.run_migrations().await?;
    Ok(db_repo.pool)
}

pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name"
    )
    .fetch_all(pool)
    .await?;

    Ok(tables.into_iter().map(|(name,)| name).collect())
}

pub async fn list_migrations(pool: &SqlitePool) -> Result<Vec<(i64, String)>, sqlx::Error> {
    let migrations: Vec<(i64, String)> =
        sqlx::query_as("SELECT version, description FROM _sqlx_migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    Ok(migrations)
}
