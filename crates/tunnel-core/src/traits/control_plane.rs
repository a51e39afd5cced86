// # Control Plane Trait
//
// Defines the interface to the provider API that owns tunnels, tunnel
// configuration and DNS records.
//
// ## Implementations
//
// - Cloudflare: `tunnel-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use tunnel_core::ControlPlane;
//
// let control_plane = /* ControlPlane implementation */;
//
// let tunnels = control_plane.find_tunnels("aabbccddeeff").await?;
// let created = control_plane.create_tunnel("aabbccddeeff").await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ingress::TunnelConfig;

/// A tunnel returned by a lookup by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FindTunnelResult {
    /// Tunnel ID
    pub id: String,
    /// Tunnel name
    pub name: String,
}

/// A freshly created tunnel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTunnelResult {
    /// Tunnel ID
    pub id: String,
    /// Connector token, when the provider returns one at creation
    #[serde(default)]
    pub token: Option<String>,
}

/// A CNAME record as stored by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    /// Record ID (provider-specific)
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record target
    pub content: String,
    /// Whether traffic is proxied through the provider edge
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Whether the stored record already matches `spec`
    pub fn matches(&self, spec: &CnameSpec) -> bool {
        self.content == spec.content && self.proxied == spec.proxied
    }
}

/// Desired state of a CNAME record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CnameSpec {
    /// Always `CNAME`
    #[serde(rename = "type")]
    pub record_type: &'static str,
    /// Fully qualified record name
    pub name: String,
    /// Record target
    pub content: String,
    /// Whether traffic is proxied through the provider edge
    pub proxied: bool,
}

impl CnameSpec {
    /// A proxied CNAME from `name` to `target`
    pub fn proxied(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            record_type: "CNAME",
            name: name.into(),
            content: target.into(),
            proxied: true,
        }
    }
}

/// Trait for control-plane implementations
///
/// Each method performs exactly one API call and decodes the response into
/// an explicit type before returning.
///
/// # Errors
///
/// - [`Error::Http`](crate::Error::Http): the call did not complete (transport)
/// - [`Error::Provider`](crate::Error::Provider): the provider answered with a
///   failure status, an unsuccessful envelope, or an unexpected shape
///
/// # Trust Level: Untrusted
///
/// Implementations must not retry, back off, cache, or spawn tasks. The
/// [`Provisioner`](crate::Provisioner) owns sequencing and failure policy;
/// a control plane only reports what happened.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// List live tunnels whose name equals `name`
    async fn find_tunnels(&self, name: &str) -> Result<Vec<FindTunnelResult>, crate::Error>;

    /// Create a remotely configured tunnel called `name`
    async fn create_tunnel(&self, name: &str) -> Result<CreateTunnelResult, crate::Error>;

    /// Fetch the connector token of an existing tunnel
    async fn tunnel_token(&self, tunnel_id: &str) -> Result<String, crate::Error>;

    /// Fetch the tunnel's configuration (empty if none has been written yet)
    async fn tunnel_config(&self, tunnel_id: &str) -> Result<TunnelConfig, crate::Error>;

    /// Replace the tunnel's configuration
    async fn put_tunnel_config(
        &self,
        tunnel_id: &str,
        config: &TunnelConfig,
    ) -> Result<(), crate::Error>;

    /// Find the CNAME record called `name`, if any
    ///
    /// When the provider holds several, the first is returned.
    async fn find_cname(&self, name: &str) -> Result<Option<DnsRecord>, crate::Error>;

    /// Create a CNAME record
    async fn create_cname(&self, spec: &CnameSpec) -> Result<DnsRecord, crate::Error>;

    /// Replace an existing record with `spec`
    async fn update_cname(
        &self,
        record_id: &str,
        spec: &CnameSpec,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
