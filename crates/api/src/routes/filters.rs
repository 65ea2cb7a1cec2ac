use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::filter::{FilterKey, FilterKind, ProfileFilter};
use domain::repositories::{AccountRepository, ProfileFilterRepository, ProfileRepository};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

async fn owned_profile(state: &AppState, auth: &AuthContext, profile_id: Uuid) -> Result<domain::models::profile::Profile, DomainError> {
    let profile = ProfileRepository::find_by_id(&state.infra.db, profile_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("profile {profile_id}")))?;
    if profile.owner_user_id != auth.user_id {
        return Err(DomainError::Forbidden("profile does not belong to caller".to_string()));
    }
    Ok(profile)
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Vec<ProfileFilter>>, ApiError> {
    owned_profile(&state, &auth, profile_id).await?;
    Ok(Json(ProfileFilterRepository::find_by_profile(&state.infra.db, profile_id).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateFilterRequest {
    account_id: Uuid,
    kind: FilterKind,
    key: String,
    value: String,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<CreateFilterRequest>,
) -> Result<(StatusCode, Json<ProfileFilter>), ApiError> {
    owned_profile(&state, &auth, profile_id).await?;

    let account = AccountRepository::find_by_id(&state.infra.db, body.account_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("account {}", body.account_id)))?;
    if account.profile_id != profile_id {
        return Err(ApiError::from(DomainError::BadRequest("account does not belong to this profile".to_string())));
    }

    let key = FilterKey::parse(&body.key).ok_or_else(|| DomainError::BadRequest(format!("unknown filter key {}", body.key)))?;

    let filter = ProfileFilter {
        id: Uuid::new_v4(),
        profile_id,
        account_id: body.account_id,
        kind: body.kind,
        key,
        value: body.value,
    };

    let created = ProfileFilterRepository::create(&state.infra.db, &filter).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((profile_id, filter_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    owned_profile(&state, &auth, profile_id).await?;

    let existing = ProfileFilterRepository::find_by_profile(&state.infra.db, profile_id).await?;
    if !existing.iter().any(|f| f.id == filter_id) {
        return Err(ApiError::from(DomainError::NotFound(format!("filter {filter_id}"))));
    }

    ProfileFilterRepository::delete(&state.infra.db, filter_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
