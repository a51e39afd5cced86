//! Tunnel ingress configuration
//!
//! The control plane replaces a tunnel's configuration as a whole document,
//! so every change is a read-modify-write of the full rule list. Fields this
//! crate does not model (e.g. `originRequest`, `warp-routing`) are carried
//! through untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Prefix identifying a catch-all rule's service
pub const CATCH_ALL_PREFIX: &str = "http_status:";

/// Service of the catch-all rule appended when none exists
pub const DEFAULT_CATCH_ALL: &str = "http_status:404";

/// A tunnel's remotely managed configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Ordered ingress rules; the first matching hostname wins
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ingress: Vec<IngressRule>,

    /// Other top-level configuration fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An explicit `null` rule list reads as no rules
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<IngressRule>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<IngressRule>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One ingress rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Public hostname; absent on the catch-all rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Local service address or `http_status:<code>`
    #[serde(default)]
    pub service: String,

    /// Other per-rule fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IngressRule {
    /// Rule routing `hostname` to `service`
    pub fn route(hostname: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            service: service.into(),
            extra: Map::new(),
        }
    }

    /// The default catch-all rule
    pub fn catch_all() -> Self {
        Self {
            hostname: None,
            service: DEFAULT_CATCH_ALL.to_string(),
            extra: Map::new(),
        }
    }

    /// Whether this rule is a fixed-status catch-all
    pub fn is_catch_all(&self) -> bool {
        self.service.starts_with(CATCH_ALL_PREFIX)
    }
}

/// Effect of [`upsert_route`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    /// No rule for the hostname existed; one was added at the front
    Inserted,
    /// A rule existed with a different service and was overwritten
    Updated,
    /// A rule already routed the hostname to the service
    Unchanged,
}

/// Ensure exactly one rule routes `hostname` to `service`
///
/// An existing rule keeps its position and extra fields; only its service
/// is replaced. A new rule goes to the front so it precedes any catch-all.
pub fn upsert_route(ingress: &mut Vec<IngressRule>, hostname: &str, service: &str) -> RouteChange {
    match ingress
        .iter_mut()
        .find(|rule| rule.hostname.as_deref() == Some(hostname))
    {
        Some(rule) if rule.service == service => RouteChange::Unchanged,
        Some(rule) => {
            rule.service = service.to_string();
            RouteChange::Updated
        }
        None => {
            ingress.insert(0, IngressRule::route(hostname, service));
            RouteChange::Inserted
        }
    }
}

/// Append the default catch-all unless some rule already is one
///
/// Returns `true` if a rule was appended.
pub fn ensure_catch_all(ingress: &mut Vec<IngressRule>) -> bool {
    if ingress.iter().any(IngressRule::is_catch_all) {
        return false;
    }
    ingress.push(IngressRule::catch_all());
    true
}
