use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::NotConfigured(_) => "not_configured",
            Self::Internal(_) => "server_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("{self}");
        }

        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (
            status,
            [("content-type", "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

impl From<jsonwebtoken::errors::Error> for ServerError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(format!("token encoding failed: {e}"))
    }
}
