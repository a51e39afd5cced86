//! Configuration types for tunnel provisioning
//!
//! [`ProvisionConfig`] is built once at process start and passed by
//! reference into everything that needs it. Nothing in this crate reads
//! ambient process state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::device::MacPolicy;

/// Default base domain for device hostnames
pub const DEFAULT_BASE_DOMAIN: &str = "nomadconnect.app";

/// Default on-device service the ingress rule forwards to
pub const DEFAULT_LOCAL_SERVICE: &str = "http://127.0.0.1:8081";

/// Default suffix for CNAME targets (`<tunnel id>.<suffix>`)
pub const DEFAULT_TUNNEL_DOMAIN: &str = "cfargotunnel.com";

/// Default control-plane API base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Main provisioning configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Control-plane API token
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub api_token: String,

    /// Account that owns the tunnels
    #[serde(default)]
    pub account_id: String,

    /// DNS zone the device hostnames live in
    #[serde(default)]
    pub zone_id: String,

    /// Base domain for device hostnames
    #[serde(default = "default_base_domain")]
    pub base_domain: String,

    /// Service address written into each ingress rule
    #[serde(default = "default_local_service")]
    pub local_service: String,

    /// Suffix of the tunnel's canonical CNAME target
    #[serde(default = "default_tunnel_domain")]
    pub tunnel_domain: String,

    /// Control-plane API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// MAC normalization policy
    #[serde(default)]
    pub mac_policy: MacPolicy,

    /// Optional MAC → tunnel ID cache
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ProvisionConfig {
    /// Create a configuration with the three required values and defaults
    /// for everything else
    pub fn new(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            account_id: account_id.into(),
            zone_id: zone_id.into(),
            ..Self::default()
        }
    }

    /// Set the base domain (stored lowercased)
    pub fn with_base_domain(mut self, base_domain: impl Into<String>) -> Self {
        self.base_domain = base_domain.into().to_ascii_lowercase();
        self
    }

    /// Set the control-plane API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the MAC normalization policy
    pub fn with_mac_policy(mut self, mac_policy: MacPolicy) -> Self {
        self.mac_policy = mac_policy;
        self
    }

    /// Set the cache configuration
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Keys that are required but absent
    ///
    /// Values are never inspected beyond emptiness, so the result is safe to
    /// report to callers.
    pub fn missing(&self) -> Vec<ConfigKey> {
        let mut missing = Vec::new();

        if self.api_token.trim().is_empty() {
            missing.push(ConfigKey::ApiToken);
        }
        if self.account_id.trim().is_empty() {
            missing.push(ConfigKey::AccountId);
        }
        if self.zone_id.trim().is_empty() {
            missing.push(ConfigKey::ZoneId);
        }
        if self.base_domain.trim().is_empty() {
            missing.push(ConfigKey::BaseDomain);
        }
        if let CacheConfig::File { path } = &self.cache
            && path.trim().is_empty()
        {
            missing.push(ConfigKey::CachePath);
        }

        missing
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(crate::Error::MissingConfig(missing));
        }

        if self.local_service.trim().is_empty() {
            return Err(crate::Error::config("Local service address cannot be empty"));
        }
        if self.tunnel_domain.trim().is_empty() {
            return Err(crate::Error::config("Tunnel domain cannot be empty"));
        }
        if !self.api_base.starts_with("https://") && !self.api_base.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "API base must use HTTP or HTTPS scheme. Got: {}",
                self.api_base
            )));
        }

        Ok(())
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            account_id: String::new(),
            zone_id: String::new(),
            base_domain: default_base_domain(),
            local_service: default_local_service(),
            tunnel_domain: default_tunnel_domain(),
            api_base: default_api_base(),
            mac_policy: MacPolicy::default(),
            cache: CacheConfig::default(),
        }
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for ProvisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionConfig")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("zone_id", &self.zone_id)
            .field("base_domain", &self.base_domain)
            .field("local_service", &self.local_service)
            .field("tunnel_domain", &self.tunnel_domain)
            .field("api_base", &self.api_base)
            .field("mac_policy", &self.mac_policy)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Tunnel cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheConfig {
    /// No cache; every request looks the tunnel up by name
    #[default]
    None,

    /// In-process cache (lost on restart)
    Memory,

    /// JSON file cache
    File {
        /// Path to the cache file
        path: String,
    },
}

impl CacheConfig {
    /// Get the cache type name
    pub fn type_name(&self) -> &'static str {
        match self {
            CacheConfig::None => "none",
            CacheConfig::Memory => "memory",
            CacheConfig::File { .. } => "file",
        }
    }
}

/// Name of a required configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    /// Control-plane API token
    ApiToken,
    /// Account identifier
    AccountId,
    /// DNS zone identifier
    ZoneId,
    /// Base domain for hostnames
    BaseDomain,
    /// Path of the file cache
    CachePath,
}

impl ConfigKey {
    /// Stable key name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiToken => "api_token",
            ConfigKey::AccountId => "account_id",
            ConfigKey::ZoneId => "zone_id",
            ConfigKey::BaseDomain => "base_domain",
            ConfigKey::CachePath => "cache_path",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_domain() -> String {
    DEFAULT_BASE_DOMAIN.to_string()
}

fn default_local_service() -> String {
    DEFAULT_LOCAL_SERVICE.to_string()
}

fn default_tunnel_domain() -> String {
    DEFAULT_TUNNEL_DOMAIN.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProvisionConfig::default();
        assert_eq!(config.base_domain, "nomadconnect.app");
        assert_eq!(config.local_service, "http://127.0.0.1:8081");
        assert_eq!(config.tunnel_domain, "cfargotunnel.com");
        assert_eq!(config.mac_policy, MacPolicy::Strip);
        assert_eq!(config.cache, CacheConfig::None);
    }

    #[test]
    fn missing_reports_required_keys_only() {
        let config = ProvisionConfig::default();
        assert_eq!(
            config.missing(),
            vec![ConfigKey::ApiToken, ConfigKey::AccountId, ConfigKey::ZoneId]
        );

        let config = ProvisionConfig::new("token", "acct", "zone");
        assert!(config.missing().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_cache_needs_a_path() {
        let config = ProvisionConfig::new("token", "acct", "zone").with_cache(CacheConfig::File {
            path: String::new(),
        });
        assert_eq!(config.missing(), vec![ConfigKey::CachePath]);
        assert!(matches!(
            config.validate(),
            Err(crate::Error::MissingConfig(keys)) if keys == vec![ConfigKey::CachePath]
        ));
    }

    #[test]
    fn base_domain_is_lowercased() {
        let config = ProvisionConfig::new("t", "a", "z").with_base_domain("Devices.Example.COM");
        assert_eq!(config.base_domain, "devices.example.com");
    }

    #[test]
    fn rejects_non_http_api_base() {
        let config = ProvisionConfig::new("t", "a", "z").with_api_base("ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_token_not_exposed_in_debug() {
        let config = ProvisionConfig::new("secret_token_12345", "acct", "zone");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("ProvisionConfig"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ProvisionConfig = serde_json::from_value(serde_json::json!({
            "api_token": "t",
            "account_id": "a",
            "zone_id": "z",
            "mac_policy": "strict",
            "cache": { "type": "file", "path": "/var/lib/tunneld/cache.json" }
        }))
        .unwrap();

        assert_eq!(config.mac_policy, MacPolicy::Strict);
        assert_eq!(config.base_domain, DEFAULT_BASE_DOMAIN);
        assert_eq!(config.cache.type_name(), "file");
    }
}
