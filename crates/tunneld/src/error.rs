//! HTTP error mapping for the provisioning API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use tunnel_core::{ConfigKey, MacError};

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed MAC address.
    #[error(transparent)]
    BadMac(#[from] MacError),

    /// Required configuration is absent.
    #[error("Service is not configured")]
    Misconfigured(Vec<ConfigKey>),

    /// A control-plane call failed; the detail is logged, never returned.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),

    /// No route for this path and method.
    #[error("Not found")]
    NotFound,
}

/// Error response format for API errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<&'static str>>,
}

impl From<tunnel_core::Error> for ApiError {
    fn from(err: tunnel_core::Error) -> Self {
        match err {
            tunnel_core::Error::InvalidMac(e) => ApiError::BadMac(e),
            tunnel_core::Error::MissingConfig(keys) => ApiError::Misconfigured(keys),
            e if e.is_upstream() => ApiError::Upstream(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadMac(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: e.code(),
                    message: Some(e.to_string()),
                    missing: None,
                },
            ),
            ApiError::Misconfigured(keys) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "misconfigured",
                    message: Some("Service is not configured".to_string()),
                    missing: Some(keys.iter().map(ConfigKey::as_str).collect()),
                },
            ),
            ApiError::Upstream(detail) => {
                error!(error = %detail, "Provisioning failed upstream");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        error: "upstream_failure",
                        message: Some("Provisioning failed".to_string()),
                        missing: None,
                    },
                )
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "Provisioning failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "internal_error",
                        message: Some("Internal error".to_string()),
                        missing: None,
                    },
                )
            }
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "not_found",
                    message: None,
                    missing: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_api_errors() {
        let err: ApiError = tunnel_core::Error::provider("cloudflare", "boom").into();
        assert!(matches!(err, ApiError::Upstream(_)));

        let err: ApiError = tunnel_core::Error::http("connection reset").into();
        assert!(matches!(err, ApiError::Upstream(_)));

        let err: ApiError = tunnel_core::Error::invalid_token("short").into();
        assert!(matches!(err, ApiError::Upstream(_)));

        let err: ApiError = tunnel_core::Error::MissingConfig(vec![ConfigKey::ZoneId]).into();
        assert!(matches!(err, ApiError::Misconfigured(ref k) if k == &[ConfigKey::ZoneId]));

        let err: ApiError = tunnel_core::Error::cache("disk full").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::BadMac(MacError::Missing).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Misconfigured(vec![]).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Upstream("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    }
}
