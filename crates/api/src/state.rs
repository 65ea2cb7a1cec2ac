use std::sync::Arc;

use common::Config;
use domain::services::scheduler::SchedulerDeps;
use infra::ServerInfra;

/// Application state shared across all request handlers (cloned per
/// request by Axum's state management, hence the `Arc` wrapping).
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Config,
    pub(crate) infra: Arc<ServerInfra>,
    pub(crate) scheduler: Arc<SchedulerDeps>,
}
