//! Shared axum handler state.

use std::sync::Arc;

use crate::cache::PermissionCache;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::orchestrator::ChatOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub config: Arc<AppConfig>,
    pub pool: DbPool,
    pub permission_cache: Arc<PermissionCache>,
}
