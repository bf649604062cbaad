use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::maps::MapError;
use crate::search::SearchError;

/// Every failure an endpoint can answer with. The body is always
/// `{"error": message}`; storage failures add `details`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Session ID required")]
    Unauthenticated,

    #[error("Unauthorized")]
    Forbidden,

    #[error("Map not found")]
    NotFound,

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{message}")]
    Storage {
        message: &'static str,
        details: String,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn invalid_json() -> Self {
        Self::InvalidInput("Invalid JSON in request body".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => *status,
            Self::Storage { .. } | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Storage { message, details } => {
                error!(error = %details, "{message}");
                json!({ "error": message, "details": details })
            }
            _ => {
                if status.is_server_error() {
                    warn!(status = status.as_u16(), error = %self, "request failed");
                }
                json!({ "error": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::EmptyQuery => {
                Self::InvalidInput("Query is required and must be a non-empty string".to_string())
            }
            SearchError::ProviderMisconfigured => Self::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: e.to_string(),
            },
            SearchError::ProviderUnavailable { status, .. } => Self::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message: e.to_string(),
            },
            SearchError::Network(_) => Self::Unexpected(e.to_string()),
        }
    }
}

/// Maps a [`MapError`]; `context` names the failed operation for storage errors.
pub(super) fn map_error(context: &'static str) -> impl Fn(MapError) -> ApiError {
    move |e| match e {
        MapError::NotFound => ApiError::NotFound,
        MapError::Forbidden => ApiError::Forbidden,
        MapError::Storage(e) => ApiError::Storage {
            message: context,
            details: e.to_string(),
        },
    }
}
