use std::collections::HashSet;

use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::profile::Profile;
use domain::models::timeline::{DateEntry, DateGroup};
use domain::models::user::User;
use domain::repositories::{AccountRepository, ProfileFilterRepository, ProfileRepository, UserRepository};
use domain::services::filter::apply_profile_filter;
use domain::store::{StoreId, VersionedStore};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthContext>) -> Result<Json<User>, ApiError> {
    let user = UserRepository::find_by_id(&state.infra.db, auth.user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("user {}", auth.user_id)))?;
    Ok(Json(user))
}

pub(crate) async fn list(State(state): State<AppState>, Extension(auth): Extension<AuthContext>) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(ProfileRepository::find_by_owner(&state.infra.db, auth.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateProfileRequest {
    slug: String,
    display_name: String,
    description: Option<String>,
    theme: Option<String>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    if ProfileRepository::find_by_slug(&state.infra.db, &body.slug).await?.is_some() {
        return Err(ApiError::from(DomainError::Conflict(format!("slug {} already in use", body.slug))));
    }

    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4(),
        owner_user_id: auth.user_id,
        slug: body.slug,
        display_name: body.display_name,
        description: body.description,
        theme: body.theme,
        created_at: now,
        updated_at: now,
    };

    let created = ProfileRepository::create(&state.infra.db, &profile).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn owned_profile(state: &AppState, auth: &AuthContext, profile_id: Uuid) -> Result<Profile, DomainError> {
    let profile = ProfileRepository::find_by_id(&state.infra.db, profile_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("profile {profile_id}")))?;
    if profile.owner_user_id != auth.user_id {
        return Err(DomainError::Forbidden("profile does not belong to caller".to_string()));
    }
    Ok(profile)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateProfileRequest {
    display_name: Option<String>,
    description: Option<String>,
    theme: Option<String>,
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let mut profile = owned_profile(&state, &auth, profile_id).await?;

    if let Some(display_name) = body.display_name {
        profile.display_name = display_name;
    }
    if body.description.is_some() {
        profile.description = body.description;
    }
    if body.theme.is_some() {
        profile.theme = body.theme;
    }
    profile.updated_at = Utc::now();

    Ok(Json(ProfileRepository::update(&state.infra.db, &profile).await?))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(profile_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    owned_profile(&state, &auth, profile_id).await?;
    ProfileRepository::delete(&state.infra.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileTimelineQuery {
    limit: Option<usize>,
    before: Option<String>,
}

/// Drops timeline entries whose originating account is not one of this
/// profile's own accounts (§4.7 steps 2-3: the per-user timeline mixes
/// every profile's accounts, so scoping to one profile happens here).
fn restrict_to_accounts(groups: Vec<DateGroup>, account_ids: &HashSet<Uuid>) -> Vec<DateGroup> {
    groups
        .into_iter()
        .filter_map(|group| {
            let entries: Vec<DateEntry> = group
                .entries
                .into_iter()
                .filter_map(|entry| match entry {
                    DateEntry::Item(item) => account_ids.contains(&item.account_id).then_some(DateEntry::Item(item)),
                    DateEntry::CommitGroup(mut commit_group) => {
                        commit_group.commits.retain(|c| account_ids.contains(&c.account_id));
                        if commit_group.commits.is_empty() {
                            None
                        } else {
                            let (additions, deletions, files) =
                                domain::models::timeline::CommitGroup::recompute_totals(&commit_group.commits);
                            commit_group.total_additions = additions;
                            commit_group.total_deletions = deletions;
                            commit_group.total_files_changed = files;
                            Some(DateEntry::CommitGroup(commit_group))
                        }
                    }
                })
                .collect();

            if entries.is_empty() { None } else { Some(DateGroup { date_key: group.date_key, entries }) }
        })
        .collect()
}

pub(crate) async fn profile_timeline(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(slug): Path<String>,
    Query(query): Query<ProfileTimelineQuery>,
) -> Result<Json<Vec<DateGroup>>, ApiError> {
    let profile = ProfileRepository::find_by_slug(&state.infra.db, &slug)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("profile {slug}")))?;
    if profile.owner_user_id != auth.user_id {
        return Err(ApiError::from(DomainError::Forbidden("profile does not belong to caller".to_string())));
    }

    let accounts = AccountRepository::find_by_profile(&state.infra.db, profile.id).await?;
    let account_ids: HashSet<Uuid> = accounts.iter().map(|a| a.id).collect();

    let store_id = StoreId::Timeline { user_id: profile.owner_user_id.to_string() };
    let groups = match state.infra.store.get_latest(&store_id).await.map_err(DomainError::from)? {
        Some(snapshot) => match snapshot.payload {
            domain::models::snapshot::SnapshotPayload::Timeline(payload) => payload.groups,
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    let scoped = restrict_to_accounts(groups, &account_ids);
    let filters = ProfileFilterRepository::find_by_profile(&state.infra.db, profile.id).await?;
    let filtered = apply_profile_filter(scoped, &filters, query.before.as_deref(), query.limit);

    Ok(Json(filtered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::account::Platform;
    use domain::models::timeline::{TaskItemPayload, TimelineItem, TimelineItemPayload};

    fn item(account_id: Uuid) -> TimelineItem {
        TimelineItem {
            id: format!("linear:task:{account_id}"),
            platform: Platform::Linear,
            timestamp: Utc::now(),
            title: "ship it".to_string(),
            url: "https://example.com".to_string(),
            payload: TimelineItemPayload::Task(TaskItemPayload {
                status: "done".to_string(),
                description: "ship it".to_string(),
            }),
            account_id,
        }
    }

    #[test]
    fn restrict_to_accounts_drops_items_from_other_accounts() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let groups = vec![DateGroup {
            date_key: "2026-01-01".to_string(),
            entries: vec![DateEntry::Item(item(mine)), DateEntry::Item(item(other))],
        }];

        let allowed: HashSet<Uuid> = [mine].into_iter().collect();
        let scoped = restrict_to_accounts(groups, &allowed);

        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].entries.len(), 1);
        match &scoped[0].entries[0] {
            DateEntry::Item(item) => assert_eq!(item.account_id, mine),
            DateEntry::CommitGroup(_) => panic!("expected a plain item"),
        }
    }

    #[test]
    fn restrict_to_accounts_drops_a_date_group_left_empty() {
        let other = Uuid::new_v4();
        let groups = vec![DateGroup {
            date_key: "2026-01-01".to_string(),
            entries: vec![DateEntry::Item(item(other))],
        }];

        let allowed: HashSet<Uuid> = [Uuid::new_v4()].into_iter().collect();
        let scoped = restrict_to_accounts(groups, &allowed);

        assert!(scoped.is_empty());
    }
}
