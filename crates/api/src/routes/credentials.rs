use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::account::Platform;
use domain::models::credential::PlatformCredential;
use domain::repositories::{PlatformCredentialRepository, ProfileRepository};
use domain::services::vault::CredentialVault;

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

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileScope {
    profile_id: Uuid,
}

/// Never echoes back the encrypted secret (§8 credential-at-rest).
#[derive(Debug, Serialize)]
pub(crate) struct CredentialView {
    id: Uuid,
    profile_id: Uuid,
    platform: Platform,
    client_id: String,
    is_verified: bool,
}

impl From<PlatformCredential> for CredentialView {
    fn from(c: PlatformCredential) -> Self {
        CredentialView {
            id: c.id,
            profile_id: c.profile_id,
            platform: c.platform,
            client_id: c.client_id,
            is_verified: c.is_verified,
        }
    }
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(platform): Path<String>,
    Query(query): Query<ProfileScope>,
) -> Result<Json<Option<CredentialView>>, ApiError> {
    owned_profile(&state, &auth, query.profile_id).await?;
    let platform = Platform::parse(&platform).ok_or_else(|| DomainError::BadRequest(format!("unknown platform {platform}")))?;

    let credentials = PlatformCredentialRepository::find_by_profile(&state.infra.db, query.profile_id).await?;
    let found = credentials.into_iter().find(|c| c.platform == platform);
    Ok(Json(found.map(CredentialView::from)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpsertCredentialRequest {
    profile_id: Uuid,
    client_id: String,
    client_secret: String,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(platform): Path<String>,
    Json(body): Json<UpsertCredentialRequest>,
) -> Result<(StatusCode, Json<CredentialView>), ApiError> {
    owned_profile(&state, &auth, body.profile_id).await?;
    let platform = Platform::parse(&platform).ok_or_else(|| DomainError::BadRequest(format!("unknown platform {platform}")))?;

    let existing = PlatformCredentialRepository::find_by_profile(&state.infra.db, body.profile_id)
        .await?
        .into_iter()
        .find(|c| c.platform == platform);

    let client_secret_encrypted = state.infra.vault.encrypt(&body.client_secret).map_err(DomainError::from)?;

    let credential = PlatformCredential {
        id: existing.map(|c| c.id).unwrap_or_else(Uuid::new_v4),
        profile_id: body.profile_id,
        platform,
        client_id: body.client_id,
        client_secret_encrypted,
        is_verified: false,
    };

    let saved = PlatformCredentialRepository::upsert(&state.infra.db, &credential).await?;
    Ok((StatusCode::CREATED, Json(CredentialView::from(saved))))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(platform): Path<String>,
    Query(query): Query<ProfileScope>,
) -> Result<StatusCode, ApiError> {
    owned_profile(&state, &auth, query.profile_id).await?;
    let platform = Platform::parse(&platform).ok_or_else(|| DomainError::BadRequest(format!("unknown platform {platform}")))?;

    let credentials = PlatformCredentialRepository::find_by_profile(&state.infra.db, query.profile_id).await?;
    let Some(credential) = credentials.into_iter().find(|c| c.platform == platform) else {
        return Err(ApiError::from(DomainError::NotFound(format!("credential for platform {platform}"))));
    };

    PlatformCredentialRepository::delete(&state.infra.db, credential.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
