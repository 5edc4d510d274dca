use crate::AppState;
use crate::error::ServerError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use loggate_core::identity::Session;
use loggate_core::mdc;
use serde::Deserialize;
use serde_json::{Map, Value, json};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

/// POST /session/login
///
/// Stores the username in the session attribute the user logging layer reads.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(ServerError::BadRequest("username must not be blank".into()));
    }

    session.set_attribute(state.user_logging.user_session_attribute.clone(), username);
    tracing::info!(session_id = %session.id(), "Session login");

    Ok(Json(json!({
        "session_id": session.id(),
        "username": username,
    })))
}

/// POST /session/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> StatusCode {
    session.remove_attribute(&state.user_logging.user_session_attribute);
    state.sessions.invalidate(session.id());
    tracing::info!(session_id = %session.id(), "Session logout");
    StatusCode::NO_CONTENT
}

/// GET /whoami
///
/// Echoes the diagnostic context as every log line of this request sees it.
pub async fn whoami() -> impl IntoResponse {
    tracing::info!("whoami");
    let context: Map<String, Value> = mdc::snapshot()
        .into_iter()
        .map(|(k, v)| (k, v.map(Value::String).unwrap_or(Value::Null)))
        .collect();
    Json(json!({ "context": context }))
}
