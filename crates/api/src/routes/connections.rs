use std::collections::HashMap;

use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::account::{Account, AccountSetting, Platform};
use domain::repositories::{AccountRepository, AccountSettingRepository, ProfileRepository};
use domain::services::scheduler::{refresh_all as scheduler_refresh_all, refresh_one};
use domain::services::vault::CredentialVault;
use domain::store::VersionedStore;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

async fn owned_account(state: &AppState, auth: &AuthContext, account_id: Uuid) -> Result<Account, DomainError> {
    let account = AccountRepository::find_by_id(&state.infra.db, account_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("account {account_id}")))?;
    let profile = ProfileRepository::find_by_id(&state.infra.db, account.profile_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("profile {}", account.profile_id)))?;
    if profile.owner_user_id != auth.user_id {
        return Err(DomainError::Forbidden("account does not belong to caller".to_string()));
    }
    Ok(account)
}

async fn owned_profile(state: &AppState, auth: &AuthContext, profile_id: Uuid) -> Result<domain::models::profile::Profile, DomainError> {
    let profile = ProfileRepository::find_by_id(&state.infra.db, profile_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("profile {profile_id}")))?;
    if profile.owner_user_id != auth.user_id {
        return Err(DomainError::Forbidden("profile does not belong to caller".to_string()));
    }
    Ok(profile)
}

/// Never echoes back `access_token_encrypted`/`refresh_token_encrypted`
/// (§8 credential-at-rest): ciphertext has no business leaving the vault
/// boundary even encrypted.
#[derive(Debug, Serialize)]
pub(crate) struct AccountView {
    id: Uuid,
    profile_id: Uuid,
    platform: Platform,
    external_user_id: String,
    external_handle: String,
    token_expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    last_fetched_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(a: Account) -> Self {
        AccountView {
            id: a.id,
            profile_id: a.profile_id,
            platform: a.platform,
            external_user_id: a.external_user_id,
            external_handle: a.external_handle,
            token_expires_at: a.token_expires_at,
            is_active: a.is_active,
            last_fetched_at: a.last_fetched_at,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ConnectionView {
    #[serde(flatten)]
    account: AccountView,
    settings: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    profile_id: Uuid,
    #[serde(default)]
    include_settings: bool,
}

async fn settings_map(state: &AppState, account_id: Uuid) -> Result<HashMap<String, serde_json::Value>, DomainError> {
    let settings = AccountSettingRepository::find_by_account(&state.infra.db, account_id).await?;
    Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ConnectionView>>, ApiError> {
    owned_profile(&state, &auth, query.profile_id).await?;

    let accounts = AccountRepository::find_by_profile(&state.infra.db, query.profile_id)
        .await
        .map_err(ApiError::from)?;

    let mut views = Vec::with_capacity(accounts.len());
    for account in accounts {
        let settings = if query.include_settings {
            Some(settings_map(&state, account.id).await.map_err(ApiError::from)?)
        } else {
            None
        };
        views.push(ConnectionView { account: account.into(), settings });
    }

    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateConnectionRequest {
    profile_id: Uuid,
    platform: String,
    external_user_id: String,
    external_handle: String,
    access_token: String,
    refresh_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<AccountView>), ApiError> {
    owned_profile(&state, &auth, body.profile_id).await?;

    let platform = Platform::parse(&body.platform).ok_or_else(|| DomainError::BadRequest(format!("unknown platform {}", body.platform)))?;

    let access_token_encrypted = state.infra.vault.encrypt(&body.access_token).map_err(DomainError::from).map_err(ApiError::from)?;
    let refresh_token_encrypted = body
        .refresh_token
        .as_deref()
        .map(|t| state.infra.vault.encrypt(t))
        .transpose()
        .map_err(DomainError::from)
        .map_err(ApiError::from)?;

    let now = Utc::now();
    let account = Account {
        id: Uuid::new_v4(),
        profile_id: body.profile_id,
        platform,
        external_user_id: body.external_user_id,
        external_handle: body.external_handle,
        access_token_encrypted,
        refresh_token_encrypted,
        token_expires_at: body.token_expires_at,
        is_active: true,
        last_fetched_at: None,
        created_at: now,
        updated_at: now,
    };

    let created = AccountRepository::create(&state.infra.db, &account).await.map_err(ApiError::from)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateConnectionRequest {
    is_active: Option<bool>,
    external_handle: Option<String>,
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
    Json(body): Json<UpdateConnectionRequest>,
) -> Result<Json<AccountView>, ApiError> {
    let mut account = owned_account(&state, &auth, account_id).await?;

    if let Some(is_active) = body.is_active {
        account.is_active = is_active;
    }
    if let Some(handle) = body.external_handle {
        account.external_handle = handle;
    }
    account.updated_at = Utc::now();

    let updated = AccountRepository::update(&state.infra.db, &account).await.map_err(ApiError::from)?;
    Ok(Json(updated.into()))
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteConnectionResponse {
    deleted: bool,
    deleted_stores: u64,
    affected_users: Vec<Uuid>,
}

/// Removes the account and every snapshot store it owns (§6.1 "Remove
/// account + its stores"). The owning user's timeline is left to be
/// regenerated on next sync rather than deleted outright.
pub(crate) async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<DeleteConnectionResponse>, ApiError> {
    let account = owned_account(&state, &auth, account_id).await?;
    let profile = ProfileRepository::find_by_id(&state.infra.db, account.profile_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(DomainError::NotFound(format!("profile {}", account.profile_id))))?;

    let deleted_stores = state.infra.store.purge_account(&account_id.to_string()).await.map_err(DomainError::from).map_err(ApiError::from)?;
    AccountRepository::delete(&state.infra.db, account_id).await.map_err(ApiError::from)?;

    Ok(Json(DeleteConnectionResponse {
        deleted: true,
        deleted_stores,
        affected_users: vec![profile.owner_user_id],
    }))
}

/// Acknowledges immediately and runs the sync in the background, per
/// `RefreshOne`'s contract that the caller does not wait on the fetch.
pub(crate) async fn refresh(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    owned_account(&state, &auth, account_id).await?;

    let deps = state.scheduler.clone();
    tokio::spawn(async move {
        if let Err(err) = refresh_one(deps, account_id, Utc::now()).await {
            tracing::error!(account_id = %account_id, error = %err, "manual refresh failed");
        }
    });

    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn refresh_all(State(state): State<AppState>, Extension(auth): Extension<AuthContext>) -> Result<StatusCode, ApiError> {
    let profiles = ProfileRepository::find_by_owner(&state.infra.db, auth.user_id).await.map_err(ApiError::from)?;
    let mut accounts = Vec::new();
    for profile in profiles {
        accounts.extend(AccountRepository::find_by_profile(&state.infra.db, profile.id).await.map_err(ApiError::from)?);
    }

    let deps = state.scheduler.clone();
    let user_id = auth.user_id;
    tokio::spawn(async move {
        scheduler_refresh_all(deps, user_id, accounts, Utc::now()).await;
    });

    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<HashMap<String, serde_json::Value>>, ApiError> {
    owned_account(&state, &auth, account_id).await?;
    Ok(Json(settings_map(&state, account_id).await.map_err(ApiError::from)?))
}

pub(crate) async fn put_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
    Json(body): Json<HashMap<String, serde_json::Value>>,
) -> Result<Json<HashMap<String, serde_json::Value>>, ApiError> {
    owned_account(&state, &auth, account_id).await?;

    for (key, value) in body {
        let setting = AccountSetting { account_id, key, value };
        AccountSettingRepository::upsert(&state.infra.db, &setting).await.map_err(ApiError::from)?;
    }

    Ok(Json(settings_map(&state, account_id).await.map_err(ApiError::from)?))
}

async fn setting_list(state: &AppState, account_id: Uuid, key: &str) -> Result<Vec<String>, DomainError> {
    let settings = AccountSettingRepository::find_by_account(&state.infra.db, account_id).await?;
    Ok(settings
        .into_iter()
        .find(|s| s.key == key)
        .and_then(|s| serde_json::from_value::<Vec<String>>(s.value).ok())
        .unwrap_or_default())
}

pub(crate) async fn repos(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<String>>, ApiError> {
    let account = owned_account(&state, &auth, account_id).await?;
    if account.platform != Platform::GitHub {
        return Err(ApiError::from(DomainError::BadRequest("repos only apply to github connections".to_string())));
    }
    Ok(Json(setting_list(&state, account_id, "repos").await.map_err(ApiError::from)?))
}

pub(crate) async fn subreddits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<String>>, ApiError> {
    let account = owned_account(&state, &auth, account_id).await?;
    if account.platform != Platform::Reddit {
        return Err(ApiError::from(DomainError::BadRequest("subreddits only apply to reddit connections".to_string())));
    }
    Ok(Json(setting_list(&state, account_id, "subreddits").await.map_err(ApiError::from)?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use common::Config;
    use domain::models::profile::Profile;
    use domain::models::user::User;
    use domain::repositories::{AccountRepository, ProfileRepository, RateLimitRepository, UserRepository};
    use domain::services::scheduler::SchedulerDeps;
    use domain::services::vault::CredentialVault;
    use infra::{InfraAccountSync, InfraTimelineRegenerator, ServerInfra};

    async fn test_state() -> AppState {
        let mut config = Config::default();
        let db_path = std::env::temp_dir().join(format!("aggregator_test_{}.db", Uuid::new_v4()));
        config.database_url = format!("sqlite://{}?mode=rwc", db_path.display());
        config.encryption_key = Some("0".repeat(64));

        let infra = Arc::new(ServerInfra::new(&config).await.expect("infra init"));
        let scheduler = Arc::new(SchedulerDeps {
            account_repo: Arc::new(infra.db.clone()) as Arc<dyn AccountRepository>,
            profile_repo: Arc::new(infra.db.clone()) as Arc<dyn ProfileRepository>,
            rate_limit_repo: Arc::new(infra.db.clone()) as Arc<dyn RateLimitRepository>,
            account_sync: Arc::new(InfraAccountSync::new(infra.clone())),
            timeline_regenerator: Arc::new(InfraTimelineRegenerator::new(infra.clone())),
        });

        AppState { config, infra, scheduler }
    }

    async fn seed_owner(state: &AppState) -> (User, Profile) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            external_identity_id: format!("ext-{}", Uuid::new_v4()),
            display_name: "Owner".to_string(),
            email: None,
            created_at: now,
            updated_at: now,
        };
        let user = UserRepository::create(&state.infra.db, &user).await.unwrap();

        let profile = Profile {
            id: Uuid::new_v4(),
            owner_user_id: user.id,
            slug: format!("owner-{}", Uuid::new_v4()),
            display_name: "Owner".to_string(),
            description: None,
            theme: None,
            created_at: now,
            updated_at: now,
        };
        let profile = ProfileRepository::create(&state.infra.db, &profile).await.unwrap();
        (user, profile)
    }

    async fn seed_account(state: &AppState, profile: &Profile) -> Account {
        let now = Utc::now();
        let access_token_encrypted = state.infra.vault.encrypt("super-secret-token").unwrap();
        let account = Account {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            platform: Platform::GitHub,
            external_user_id: "12345".to_string(),
            external_handle: "octocat".to_string(),
            access_token_encrypted,
            refresh_token_encrypted: None,
            token_expires_at: None,
            is_active: true,
            last_fetched_at: None,
            created_at: now,
            updated_at: now,
        };
        AccountRepository::create(&state.infra.db, &account).await.unwrap()
    }

    #[tokio::test]
    async fn owned_account_rejects_other_users() {
        let state = test_state().await;
        let (_owner, profile) = seed_owner(&state).await;
        let account = seed_account(&state, &profile).await;

        let intruder = AuthContext { user_id: Uuid::new_v4() };
        let err = owned_account(&state, &intruder, account.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn owned_account_reports_not_found_for_unknown_id() {
        let state = test_state().await;
        let (owner, _profile) = seed_owner(&state).await;

        let auth = AuthContext { user_id: owner.id };
        let err = owned_account(&state, &auth, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn owned_account_succeeds_for_the_owning_user() {
        let state = test_state().await;
        let (owner, profile) = seed_owner(&state).await;
        let account = seed_account(&state, &profile).await;

        let auth = AuthContext { user_id: owner.id };
        let fetched = owned_account(&state, &auth, account.id).await.unwrap();
        assert_eq!(fetched.id, account.id);
    }

    #[tokio::test]
    async fn create_never_persists_the_plaintext_access_token() {
        let state = test_state().await;
        let (owner, profile) = seed_owner(&state).await;
        let auth = AuthContext { user_id: owner.id };

        let body = CreateConnectionRequest {
            profile_id: profile.id,
            platform: "github".to_string(),
            external_user_id: "9".to_string(),
            external_handle: "ferris".to_string(),
            access_token: "plaintext-access-token".to_string(),
            refresh_token: None,
            token_expires_at: None,
        };

        let (_status, Json(view)) = create(State(state.clone()), Extension(auth), Json(body)).await.unwrap();

        let stored = AccountRepository::find_by_id(&state.infra.db, view.id).await.unwrap().unwrap();
        assert_ne!(stored.access_token_encrypted, "plaintext-access-token");
        assert_eq!(state.infra.vault.decrypt(&stored.access_token_encrypted).unwrap(), "plaintext-access-token");
    }

    #[tokio::test]
    async fn delete_purges_the_accounts_stores_and_names_the_owning_user() {
        use domain::models::account::Platform;
        use domain::store::{PutOptions, StoreId};

        let state = test_state().await;
        let (owner, profile) = seed_owner(&state).await;
        let account = seed_account(&state, &profile).await;

        let raw_id = StoreId::Raw {
            platform: Platform::GitHub.as_str().to_string(),
            account_id: account.id.to_string(),
        };
        let meta_id = StoreId::Meta {
            platform: "github".to_string(),
            account_id: account.id.to_string(),
        };
        state.infra.store.put(&raw_id, &domain::models::snapshot::SnapshotPayload::Raw(serde_json::json!({"ok": true})), PutOptions::default()).await.unwrap();
        state.infra.store.put(&meta_id, &domain::models::snapshot::SnapshotPayload::Raw(serde_json::json!({"ok": true})), PutOptions::default()).await.unwrap();

        let auth = AuthContext { user_id: owner.id };
        let Json(response) = delete(State(state.clone()), Extension(auth), Path(account.id)).await.unwrap();

        assert!(response.deleted);
        assert_eq!(response.deleted_stores, 2);
        assert_eq!(response.affected_users, vec![owner.id]);
        assert!(state.infra.store.get_latest(&raw_id).await.unwrap().is_none());
        assert!(state.infra.store.get_latest(&meta_id).await.unwrap().is_none());
        assert!(AccountRepository::find_by_id(&state.infra.db, account.id).await.unwrap().is_none());
    }
}
