use crate::AppState;
use crate::error::ServerError;
use crate::middleware::principal::generate_token;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
}

/// POST /auth/token
///
/// Issues a bearer token whose subject becomes the request principal.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let auth = &state.config.auth;
    let secret = auth
        .jwt_secret
        .as_deref()
        .ok_or(ServerError::NotConfigured("jwt-secret"))?;

    let username = body.username.trim();
    if username.is_empty() {
        return Err(ServerError::BadRequest("username must not be blank".into()));
    }

    let token = generate_token(username, secret, auth.jwt_ttl_secs)?;
    Ok(Json(json!({
        "token": token,
        "expires_in": auth.jwt_ttl_secs,
        "token_type": "Bearer",
    })))
}
