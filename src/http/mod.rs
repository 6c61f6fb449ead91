//! axum `Router` composition (spec.md §6). Grounded on `gateway/daemon.rs`'s
//! public/protected split, adapted: no PID file, no port-fallback loop, no
//! single shared daemon token (see `auth.rs`).

pub mod auth;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let disable_auth = state.config.security.disable_auth;

    let protected = Router::new()
        .route("/api/{tenant_id}/chat", post(routes::chat))
        .route("/api/{tenant_id}/sessions", get(routes::list_sessions))
        .route("/api/{tenant_id}/sessions/{session_id}", get(routes::get_session))
        .layer(middleware::from_fn(auth::bearer_auth_middleware));

    let mut public = Router::new().route("/health", get(routes::health));

    if disable_auth {
        public = public.route("/api/{tenant_id}/test/chat", post(routes::test_chat));
    }

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
