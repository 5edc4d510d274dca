pub mod error;
pub mod handler;
pub mod middleware;

use axum::{Router, middleware as axum_mw};
use loggate_core::config::{Config, UserLoggingConfig};
use loggate_core::identity::SessionStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_logging: Arc<UserLoggingConfig>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let user_logging = Arc::new(config.user_logging());
        let sessions = Arc::new(SessionStore::from_config(&config.session));
        Self {
            config: Arc::new(config),
            user_logging,
            sessions,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", axum::routing::get(handler::health::health))
        .route("/whoami", axum::routing::get(handler::session::whoami))
        .route(
            "/session/login",
            axum::routing::post(handler::session::login),
        )
        .route(
            "/session/logout",
            axum::routing::post(handler::session::logout),
        )
        .route(
            "/auth/token",
            axum::routing::post(handler::auth::issue_token),
        );

    // Global middleware layers (outer → inner): trace, session, principal, user logging
    routes
        .layer(middleware::user_logging::UserLoggingLayer::new(
            state.user_logging.clone(),
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::principal::principal_middleware,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::session::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
