//! Tunnel provisioner
//!
//! The Provisioner drives four dependent steps for one device:
//!
//! ```text
//! DeviceId ──► resolve_tunnel ──► retrieve_token ──► configure_ingress ──► upsert_dns
//!                  │                    │                    │                  │
//!            cache / lookup /      reuse create-time    read-modify-write   find, then
//!                create             token or fetch       of ingress list    create/update
//! ```
//!
//! Every step is find-or-create or upsert, so a request that failed halfway
//! can simply be repeated: it resumes from whatever already exists. Steps
//! run strictly in order and the first error aborts the request. Nothing is
//! retried or rolled back here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ProvisionConfig;
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::ingress::{RouteChange, ensure_catch_all, upsert_route};
use crate::traits::{CnameSpec, ControlPlane, TunnelCache};

/// Minimum plausible connector token length
pub const MIN_TOKEN_LEN: usize = 32;

/// Token values that are known placeholders, not credentials
const PLACEHOLDER_TOKENS: &[&str] = &["token_placeholder", "replace_me", "your_token", "changeme"];

/// Where the tunnel ID came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelSource {
    /// Device → tunnel mapping found in the cache
    Cache,
    /// Existing tunnel found by name
    Lookup,
    /// Tunnel created by this request
    Created,
}

/// Output of the tunnel resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTunnel {
    /// Tunnel ID
    pub id: String,
    /// Connector token handed out at creation, if any
    pub token: Option<String>,
    /// How the tunnel was found
    pub source: TunnelSource,
}

/// Effect of the DNS upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsChange {
    /// No record existed; one was created
    Created,
    /// A record existed with different content or proxy flag and was replaced
    Updated,
    /// The record already matched; nothing was written
    Unchanged,
}

/// Result of a full provisioning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Connector token for the device
    pub token: String,
    /// Tunnel ID
    pub tunnel_id: String,
    /// Device hostname
    pub hostname: String,
    /// How the tunnel was found
    pub tunnel_source: TunnelSource,
    /// What happened to the ingress route
    pub ingress: RouteChange,
    /// What happened to the DNS record
    pub dns: DnsChange,
}

/// Orchestrates tunnel, token, ingress and DNS for one device at a time
///
/// ## Threading
///
/// The provisioner holds no mutable state of its own and is shared across
/// concurrent requests behind an `Arc`.
pub struct Provisioner {
    /// Provider API
    control_plane: Box<dyn ControlPlane>,

    /// Optional device → tunnel ID cache
    cache: Option<Arc<dyn TunnelCache>>,

    /// Base domain for device hostnames
    base_domain: String,

    /// Service address written into ingress rules
    local_service: String,

    /// Suffix of CNAME targets
    tunnel_domain: String,
}

impl Provisioner {
    /// Create a new provisioner
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        control_plane: Box<dyn ControlPlane>,
        cache: Option<Arc<dyn TunnelCache>>,
        config: &ProvisionConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            control_plane,
            cache,
            base_domain: config.base_domain.to_ascii_lowercase(),
            local_service: config.local_service.clone(),
            tunnel_domain: config.tunnel_domain.clone(),
        })
    }

    /// Hostname for `device`
    pub fn hostname(&self, device: &DeviceId) -> String {
        device.hostname(&self.base_domain)
    }

    /// CNAME target for `tunnel_id`
    pub fn tunnel_target(&self, tunnel_id: &str) -> String {
        format!("{}.{}", tunnel_id, self.tunnel_domain)
    }

    /// Run all four steps for `device`
    pub async fn provision(&self, device: &DeviceId) -> Result<ProvisionOutcome> {
        let hostname = self.hostname(device);
        info!(device = %device, hostname = %hostname, "Provisioning device");

        let tunnel = self.resolve_tunnel(device).await?;
        let token = self.retrieve_token(&tunnel).await?;
        let ingress = self.configure_ingress(&tunnel.id, &hostname).await?;
        let dns = self
            .upsert_dns(&hostname, &self.tunnel_target(&tunnel.id))
            .await?;

        info!(
            device = %device,
            tunnel_id = %tunnel.id,
            source = ?tunnel.source,
            ingress = ?ingress,
            dns = ?dns,
            "Device provisioned"
        );

        Ok(ProvisionOutcome {
            token,
            tunnel_id: tunnel.id,
            hostname,
            tunnel_source: tunnel.source,
            ingress,
            dns,
        })
    }

    /// Find or create the tunnel named after `device`
    ///
    /// Order: cache, then lookup by name, then create. A failed lookup
    /// response counts as "not found"; a transport failure does not.
    pub async fn resolve_tunnel(&self, device: &DeviceId) -> Result<ResolvedTunnel> {
        let name = device.as_str();

        if let Some(cache) = &self.cache {
            match cache.get(name).await {
                Ok(Some(id)) => {
                    debug!(device = %device, tunnel_id = %id, "Tunnel found in {} cache", cache.cache_name());
                    return Ok(ResolvedTunnel {
                        id,
                        token: None,
                        source: TunnelSource::Cache,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!(device = %device, "Cache lookup failed, falling through: {}", e),
            }
        }

        match self.control_plane.find_tunnels(name).await {
            Ok(tunnels) => {
                if tunnels.len() > 1 {
                    warn!(
                        device = %device,
                        "{} tunnels named {}, using the first",
                        tunnels.len(),
                        name
                    );
                }
                if let Some(tunnel) = tunnels.into_iter().next() {
                    debug!(device = %device, tunnel_id = %tunnel.id, "Existing tunnel found");
                    return Ok(ResolvedTunnel {
                        id: tunnel.id,
                        token: None,
                        source: TunnelSource::Lookup,
                    });
                }
            }
            Err(e @ Error::Provider { .. }) => {
                warn!(device = %device, "Tunnel lookup failed, treating as not found: {}", e);
            }
            Err(e) => return Err(e),
        }

        let created = self.control_plane.create_tunnel(name).await?;
        if created.id.trim().is_empty() {
            return Err(Error::provider(
                self.control_plane.provider_name(),
                "Create tunnel response has no tunnel ID",
            ));
        }
        info!(device = %device, tunnel_id = %created.id, "Tunnel created");

        if let Some(cache) = &self.cache
            && let Err(e) = cache.put(name, &created.id).await
        {
            warn!(device = %device, tunnel_id = %created.id, "Failed to cache tunnel ID: {}", e);
        }

        Ok(ResolvedTunnel {
            id: created.id,
            token: created.token,
            source: TunnelSource::Created,
        })
    }

    /// Connector token for `tunnel`
    ///
    /// Reuses the token from creation when present, otherwise fetches it.
    pub async fn retrieve_token(&self, tunnel: &ResolvedTunnel) -> Result<String> {
        let token = match &tunnel.token {
            Some(token) => token.clone(),
            None => {
                debug!(tunnel_id = %tunnel.id, "Fetching connector token");
                self.control_plane.tunnel_token(&tunnel.id).await?
            }
        };

        validate_token(&token)?;
        Ok(token)
    }

    /// Ensure the tunnel routes `hostname` to the local service
    ///
    /// The configuration is written back only when it changed.
    pub async fn configure_ingress(&self, tunnel_id: &str, hostname: &str) -> Result<RouteChange> {
        let mut config = self.control_plane.tunnel_config(tunnel_id).await?;

        let change = upsert_route(&mut config.ingress, hostname, &self.local_service);
        let catch_all_added = ensure_catch_all(&mut config.ingress);

        if change == RouteChange::Unchanged && !catch_all_added {
            debug!(tunnel_id = %tunnel_id, hostname = %hostname, "Ingress already up to date");
            return Ok(change);
        }

        self.control_plane
            .put_tunnel_config(tunnel_id, &config)
            .await?;
        info!(
            tunnel_id = %tunnel_id,
            hostname = %hostname,
            change = ?change,
            rules = config.ingress.len(),
            "Ingress configuration written"
        );

        Ok(change)
    }

    /// Ensure a proxied CNAME `hostname` → `target`
    pub async fn upsert_dns(&self, hostname: &str, target: &str) -> Result<DnsChange> {
        let spec = CnameSpec::proxied(hostname, target);

        match self.control_plane.find_cname(hostname).await? {
            Some(record) if record.matches(&spec) => {
                debug!(hostname = %hostname, "DNS record already up to date");
                Ok(DnsChange::Unchanged)
            }
            Some(record) => {
                self.control_plane.update_cname(&record.id, &spec).await?;
                info!(
                    hostname = %hostname,
                    target = %target,
                    previous = %record.content,
                    "DNS record updated"
                );
                Ok(DnsChange::Updated)
            }
            None => {
                self.control_plane.create_cname(&spec).await?;
                info!(hostname = %hostname, target = %target, "DNS record created");
                Ok(DnsChange::Created)
            }
        }
    }
}

/// Reject empty, short, or placeholder tokens
fn validate_token(token: &str) -> Result<()> {
    if PLACEHOLDER_TOKENS
        .iter()
        .any(|p| token.trim().eq_ignore_ascii_case(p))
    {
        return Err(Error::invalid_token("token is a placeholder"));
    }

    if token.len() < MIN_TOKEN_LEN {
        return Err(Error::invalid_token(format!(
            "token is {} chars, expected at least {}",
            token.len(),
            MIN_TOKEN_LEN
        )));
    }

    Ok(())
}
