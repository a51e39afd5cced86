//! Error types for tunnel provisioning
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::config::ConfigKey;
use crate::device::MacError;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tunnel provisioning
#[derive(Error, Debug)]
pub enum Error {
    /// The request carried no usable MAC address
    #[error("Invalid MAC address: {0}")]
    InvalidMac(#[from] MacError),

    /// Required configuration keys are absent
    #[error("Missing configuration: {}", format_keys(.0))]
    MissingConfig(Vec<ConfigKey>),

    /// Other configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the control plane
    #[error("HTTP error: {0}")]
    Http(String),

    /// Control plane answered with a failure or an unexpected shape
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message, including the raw upstream response where available
        message: String,
    },

    /// The connector token is missing or looks like a placeholder
    #[error("Invalid connector token: {0}")]
    InvalidToken(String),

    /// Tunnel cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP (transport) error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid token error
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Whether this error came from the control plane (or its transport).
    ///
    /// These are reported to callers as a bad gateway, without detail.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Provider { .. } | Self::InvalidToken(_)
        )
    }
}

fn format_keys(keys: &[ConfigKey]) -> String {
    keys.iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
