use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::account::Platform;
use domain::repositories::{AccountRepository, ProfileRepository};
use domain::store::{StoreId, VersionedStore};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

/// A caller may only read their own `/timeline/{user_id}` (§6.1
/// authorization rule: ownership is re-verified on every access).
fn require_self(auth: &AuthContext, user_id: Uuid) -> Result<(), DomainError> {
    if auth.user_id != user_id {
        return Err(DomainError::Forbidden("not the owner of this timeline".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelineQuery {
    from: Option<String>,
    to: Option<String>,
}

pub(crate) async fn user_timeline(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<domain::models::timeline::TimelineSnapshotPayload>, ApiError> {
    require_self(&auth, user_id)?;

    let store_id = StoreId::Timeline { user_id: user_id.to_string() };
    let snapshot = state
        .infra
        .store
        .get_latest(&store_id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::NotFound(format!("timeline for user {user_id}")))?;

    let domain::models::snapshot::SnapshotPayload::Timeline(mut payload) = snapshot.payload else {
        return Err(ApiError::from(DomainError::Internal("timeline store holds non-timeline payload".to_string())));
    };

    if let Some(from) = &query.from {
        payload.groups.retain(|g| g.date_key.as_str() >= from.as_str());
    }
    if let Some(to) = &query.to {
        payload.groups.retain(|g| g.date_key.as_str() <= to.as_str());
    }

    Ok(Json(payload))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQuery {
    account_id: Uuid,
}

pub(crate) async fn raw_snapshot(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, platform)): Path<(Uuid, String)>,
    Query(query): Query<RawQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_self(&auth, user_id)?;

    let platform = Platform::parse(&platform).ok_or_else(|| DomainError::BadRequest(format!("unknown platform {platform}")))?;

    let account = AccountRepository::find_by_id(&state.infra.db, query.account_id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::NotFound(format!("account {}", query.account_id)))?;

    let profile = ProfileRepository::find_by_id(&state.infra.db, account.profile_id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::NotFound(format!("profile {}", account.profile_id)))?;
    if profile.owner_user_id != user_id || account.platform != platform {
        return Err(ApiError::from(DomainError::Forbidden("account does not belong to this user/platform".to_string())));
    }

    let store_id = StoreId::Raw {
        platform: platform.as_str().to_string(),
        account_id: account.id.to_string(),
    };
    let snapshot = state
        .infra
        .store
        .get_latest(&store_id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::NotFound(format!("raw snapshot for account {}", account.id)))?;

    let value = serde_json::to_value(&snapshot.payload).map_err(|e| DomainError::Internal(e.to_string()))?;
    Ok(Json(value))
}
