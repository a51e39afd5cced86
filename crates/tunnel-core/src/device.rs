//! Device identity derived from a MAC address
//!
//! A [`DeviceId`] is the canonical 12-hex-digit lowercase form of a MAC.
//! It names the tunnel, keys the cache, and prefixes the device hostname.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of hex digits in a normalized MAC address
pub const DEVICE_ID_LEN: usize = 12;

/// How raw MAC input is normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacPolicy {
    /// Lowercase and drop every non-hex character (`aa:BB-cc...` is accepted)
    #[default]
    Strip,
    /// Trim and lowercase only; the result must already be 12 hex digits
    Strict,
}

/// Why a MAC address was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MacError {
    /// No MAC was supplied
    #[error("Missing mac")]
    Missing,
    /// A MAC was supplied but does not reduce to 12 hex digits
    #[error("Invalid mac format")]
    InvalidFormat,
}

impl MacError {
    /// Machine-readable error code returned to callers
    pub fn code(&self) -> &'static str {
        "bad_mac"
    }
}

/// Normalized device identity (exactly 12 chars from `[0-9a-f]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Normalize a raw MAC according to `policy`
    ///
    /// # Examples
    ///
    /// ```
    /// use tunnel_core::device::{DeviceId, MacPolicy};
    ///
    /// let id = DeviceId::parse("aa:BB:cc:DD:ee:FF", MacPolicy::Strip).unwrap();
    /// assert_eq!(id.as_str(), "aabbccddeeff");
    /// assert!(DeviceId::parse("aa:BB:cc:DD:ee:FF", MacPolicy::Strict).is_err());
    /// ```
    pub fn parse(raw: &str, policy: MacPolicy) -> Result<Self, MacError> {
        if raw.trim().is_empty() {
            return Err(MacError::Missing);
        }

        let normalized: String = match policy {
            MacPolicy::Strip => raw
                .chars()
                .map(|c| c.to_ascii_lowercase())
                .filter(|c| matches!(c, '0'..='9' | 'a'..='f'))
                .collect(),
            MacPolicy::Strict => {
                let candidate = raw.trim().to_ascii_lowercase();
                if !candidate
                    .chars()
                    .all(|c| matches!(c, '0'..='9' | 'a'..='f'))
                {
                    return Err(MacError::InvalidFormat);
                }
                candidate
            }
        };

        if normalized.len() != DEVICE_ID_LEN {
            return Err(MacError::InvalidFormat);
        }

        Ok(Self(normalized))
    }

    /// Parse an optional input, treating `None` as a missing MAC
    pub fn parse_optional(raw: Option<&str>, policy: MacPolicy) -> Result<Self, MacError> {
        match raw {
            Some(raw) => Self::parse(raw, policy),
            None => Err(MacError::Missing),
        }
    }

    /// The normalized identity
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public hostname of the device: `<id>.<base_domain>`
    pub fn hostname(&self, base_domain: &str) -> String {
        format!("{}.{}", self.0, base_domain)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
