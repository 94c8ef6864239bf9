//! Request-level failures and their single HTTP mapping.
//!
//! Every handler body returns `Result<_, AgentError>`. The kind is kept for
//! logs and metrics, but the wire contract is always `400 {"detail": ...}`.

use crate::services::extractor::ExtractError;
use crate::services::providers::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Origin unreachable, TLS failure, non-2xx status.
    #[error("{0}")]
    Transport(String),

    /// Disk full, permission denied, invalid path, filename collision.
    #[error("{0}")]
    Storage(String),

    /// Not a valid paginated document, or nothing to extract.
    #[error("{0}")]
    Parse(String),

    /// API key missing or rejected by the provider.
    #[error("{0}")]
    Credential(String),

    /// Any other generative provider failure.
    #[error("{0}")]
    Provider(String),
}

impl AgentError {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Transport(_) => "transport",
            AgentError::Storage(_) => "storage",
            AgentError::Parse(_) => "parse",
            AgentError::Credential(_) => "credential",
            AgentError::Provider(_) => "provider",
        }
    }
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) | ProviderError::Unauthorized(_) => {
                AgentError::Credential(err.to_string())
            }
            _ => AgentError::Provider(err.to_string()),
        }
    }
}

impl From<ExtractError> for AgentError {
    fn from(err: ExtractError) -> Self {
        AgentError::Parse(err.to_string())
    }
}

/// Body shared by every client-error response.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// A required input was missing or unreadable; the request never reached the handler.
#[derive(Debug)]
pub struct InputRejection {
    status: StatusCode,
    detail: String,
}

impl InputRejection {
    /// 422 for a missing required parameter or field.
    pub fn missing(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for InputRejection {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, detail = %self.detail, "Request rejected");
        (self.status, Json(ErrorDetail { detail: self.detail })).into_response()
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        tracing::warn!(error.kind = kind, error = %self, "Request failed");
        metrics::counter!("agent_errors_total", "kind" => kind).increment(1);

        (
            StatusCode::BAD_REQUEST,
            Json(ErrorDetail {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_a_flat_400() {
        let errors = [
            AgentError::Transport("dns failure".to_string()),
            AgentError::Storage("disk full".to_string()),
            AgentError::Parse("not a pdf".to_string()),
            AgentError::Credential("no key".to_string()),
            AgentError::Provider("quota".to_string()),
        ];

        for err in errors {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn message_is_passed_through_verbatim() {
        let err = AgentError::Transport("Network error".to_string());
        assert_eq!(err.to_string(), "Network error");
    }

    #[test]
    fn missing_key_is_a_credential_failure() {
        let err: AgentError = ProviderError::NotConfigured("no API key".to_string()).into();
        assert_eq!(err.kind(), "credential");

        let err: AgentError = ProviderError::Unauthorized("403".to_string()).into();
        assert_eq!(err.kind(), "credential");

        let err: AgentError = ProviderError::RateLimited.into();
        assert_eq!(err.kind(), "provider");
    }

    #[test]
    fn missing_input_is_unprocessable() {
        let rejection = InputRejection::missing("Missing required parameter: url");
        assert_eq!(rejection.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn extraction_failures_are_parse_failures() {
        let err: AgentError = ExtractError::Empty.into();
        assert_eq!(err.kind(), "parse");
    }
}
