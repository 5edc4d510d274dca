use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::{extract::Request, middleware::Next, response::Response};

/// Attaches the caller's `Session` to the request, creating one when the
/// cookie is missing or stale. New sessions are announced with `Set-Cookie`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.session.cookie_name.as_str();
    let existing = session_cookie(request.headers(), cookie_name);
    let (session, created) = state.sessions.get_or_create(existing.as_deref());
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if created {
        let cookie = format!("{cookie_name}={}; Path=/; HttpOnly", session.id());
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("Invalid session cookie header: {e}"),
        }
    }
    response
}

/// Value of cookie `name` from any `Cookie` header on the request.
pub(crate) fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}
