mod connections;
mod credentials;
mod filters;
mod profiles;
mod timeline;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, patch, post};

use crate::auth::require_auth;
use crate::state::AppState;

async fn health() -> &'static str {
    "ok"
}

/// Builds the full §6.1 route table. `/health` sits outside the auth
/// middleware; everything under `/api/v1` requires a verified caller.
pub(crate) fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/me", get(profiles::me))
        .route("/timeline/{user_id}", get(timeline::user_timeline))
        .route("/timeline/{user_id}/raw/{platform}", get(timeline::raw_snapshot))
        .route("/connections", get(connections::list).post(connections::create))
        .route(
            "/connections/{account_id}",
            patch(connections::update).delete(connections::delete),
        )
        .route("/connections/{account_id}/refresh", post(connections::refresh))
        .route("/connections/refresh-all", post(connections::refresh_all))
        .route(
            "/connections/{account_id}/settings",
            get(connections::get_settings).put(connections::put_settings),
        )
        .route("/connections/{account_id}/repos", get(connections::repos))
        .route("/connections/{account_id}/subreddits", get(connections::subreddits))
        .route("/profiles", get(profiles::list).post(profiles::create))
        .route(
            "/profiles/{profile_id}",
            patch(profiles::update).delete(profiles::delete),
        )
        .route("/profiles/{profile_id}/filters", get(filters::list).post(filters::create))
        .route("/profiles/{profile_id}/filters/{filter_id}", delete(filters::delete))
        .route("/profiles/{slug}/timeline", get(profiles::profile_timeline))
        .route(
            "/credentials/{platform}",
            get(credentials::list).post(credentials::create).delete(credentials::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}
