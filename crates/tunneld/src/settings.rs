//! Process configuration read from the environment
//!
//! Only malformed values are start-up errors. Absent credentials are kept
//! as empty strings so the service can still come up and report them on
//! `/health`.

use anyhow::Result;
use std::net::SocketAddr;
use tracing::Level;

use tunnel_core::config::{
    CacheConfig, DEFAULT_API_BASE, DEFAULT_BASE_DOMAIN, DEFAULT_LOCAL_SERVICE,
    DEFAULT_TUNNEL_DOMAIN, ProvisionConfig,
};
use tunnel_core::device::MacPolicy;

/// Default bind address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";

/// Everything `tunneld` needs to start
pub struct Settings {
    /// Provisioning configuration handed to the core
    pub provision: ProvisionConfig,
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// Maximum log level
    pub log_level: Level,
}

impl Settings {
    /// Load settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`, treating empty values as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let mac_policy = match var("TUNNELD_MAC_POLICY").as_deref() {
            None | Some("strip") => MacPolicy::Strip,
            Some("strict") => MacPolicy::Strict,
            Some(other) => anyhow::bail!(
                "TUNNELD_MAC_POLICY '{}' is not supported. \
                Supported policies: strip, strict",
                other
            ),
        };

        let cache = match var("TUNNELD_CACHE_TYPE").as_deref() {
            None | Some("none") => CacheConfig::None,
            Some("memory") => CacheConfig::Memory,
            // An empty path is reported as missing configuration, not rejected here
            Some("file") => CacheConfig::File {
                path: var("TUNNELD_CACHE_PATH").unwrap_or_default(),
            },
            Some(other) => anyhow::bail!(
                "TUNNELD_CACHE_TYPE '{}' is not supported. \
                Supported types: none, memory, file",
                other
            ),
        };

        let api_base = or_default("TUNNELD_API_BASE", DEFAULT_API_BASE);
        if !api_base.starts_with("https://") && !api_base.starts_with("http://") {
            anyhow::bail!(
                "TUNNELD_API_BASE must use HTTP or HTTPS scheme. Got: {}",
                api_base
            );
        }

        let listen_addr_raw = or_default("TUNNELD_LISTEN_ADDR", DEFAULT_LISTEN_ADDR);
        let listen_addr: SocketAddr = listen_addr_raw.parse().map_err(|e| {
            anyhow::anyhow!(
                "TUNNELD_LISTEN_ADDR '{}' is not a valid socket address: {}",
                listen_addr_raw,
                e
            )
        })?;

        let log_level = match or_default("TUNNELD_LOG_LEVEL", "info")
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            other => anyhow::bail!(
                "TUNNELD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        };

        let provision = ProvisionConfig {
            api_token: var("CF_API_TOKEN").unwrap_or_default(),
            account_id: var("CF_ACCOUNT_ID").unwrap_or_default(),
            zone_id: var("CF_ZONE_ID").unwrap_or_default(),
            base_domain: or_default("BASE_HOST", DEFAULT_BASE_DOMAIN).to_ascii_lowercase(),
            local_service: or_default("TUNNELD_LOCAL_SERVICE", DEFAULT_LOCAL_SERVICE),
            tunnel_domain: or_default("TUNNELD_TUNNEL_DOMAIN", DEFAULT_TUNNEL_DOMAIN),
            api_base,
            mac_policy,
            cache,
        };

        Ok(Self {
            provision,
            listen_addr,
            log_level,
        })
    }
}
