use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{extract::Request, middleware::Next, response::Response};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use loggate_core::identity::Principal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Establishes the request `Principal` from a bearer token.
///
/// A missing or invalid token leaves the request anonymous; rejecting it is
/// left to the routes that need authentication.
pub async fn principal_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(secret) = state.config.auth.jwt_secret.as_deref()
        && let Some(principal) = bearer_principal(request.headers(), secret)
    {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

fn bearer_principal(headers: &HeaderMap, secret: &str) -> Option<Principal> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))?;

    let key = DecodingKey::from_secret(secret.as_bytes());
    match decode::<Claims>(token, &key, &Validation::default()) {
        Ok(data) => Some(Principal::new(data.claims.sub)),
        Err(e) => {
            tracing::debug!("Ignoring bearer token: {e}");
            None
        }
    }
}

/// Generate a token whose subject becomes the principal name.
pub fn generate_token(
    username: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: username.to_string(),
        iat: now,
        exp: now.saturating_add(usize::try_from(ttl_secs).unwrap_or(usize::MAX)),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
