//! # Aggregator API Server
//!
//! The HTTP entry point (§6), built with Axum on top of the `infra`
//! façade. Route handlers stay thin: they extract/validate, call into
//! `domain` for business rules, and let `error::ApiError` translate
//! failures to the §7 status codes.

mod auth;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use common::Config;
use domain::repositories::{AccountRepository, ProfileRepository, RateLimitRepository};
use domain::services::scheduler::SchedulerDeps;
use infra::{InfraAccountSync, InfraTimelineRegenerator, ServerInfra};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

fn cors_layer(cfg: &Config) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = cfg
        .cors_allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    common::init_tracing();

    let config = Config::load().expect("Failed to load configuration");

    let infra = Arc::new(ServerInfra::new(&config).await.expect("Failed to initialize infrastructure"));

    let scheduler = Arc::new(SchedulerDeps {
        account_repo: Arc::new(infra.db.clone()) as Arc<dyn AccountRepository>,
        profile_repo: Arc::new(infra.db.clone()) as Arc<dyn ProfileRepository>,
        rate_limit_repo: Arc::new(infra.db.clone()) as Arc<dyn RateLimitRepository>,
        account_sync: Arc::new(InfraAccountSync::new(infra.clone())),
        timeline_regenerator: Arc::new(InfraTimelineRegenerator::new(infra.clone())),
    });

    let state = AppState {
        config: config.clone(),
        infra,
        scheduler,
    };

    let app = routes::router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.api_host, config.api_port);
    tracing::info!(%addr, "starting aggregator api server");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
