//! RPC error types and their HTTP mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conclave_governance::GovernanceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Blacklisted,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("server error: {0}")]
    Server(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Blacklisted => StatusCode::FORBIDDEN,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Governance(e) => match e {
                GovernanceError::NotVisible(_) | GovernanceError::NotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                GovernanceError::Forbidden(_) => StatusCode::FORBIDDEN,
                GovernanceError::Conflict(_) => StatusCode::BAD_REQUEST,
                GovernanceError::Configuration(_) | GovernanceError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Message shown to the caller. Internal failures are not described.
    pub fn detail(&self) -> String {
        match self {
            Self::Governance(
                GovernanceError::NotFound(msg)
                | GovernanceError::Forbidden(msg)
                | GovernanceError::Conflict(msg),
            ) => msg.clone(),
            Self::Governance(GovernanceError::Configuration(_) | GovernanceError::Store(_))
            | Self::Server(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for RpcError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { detail: self.detail() })).into_response()
    }
}
