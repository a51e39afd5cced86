//! Core traits for tunnel provisioning
//!
//! This module defines the abstract interfaces the provisioner depends on.
//!
//! - [`ControlPlane`]: Tunnel, ingress and DNS calls against the provider API
//! - [`TunnelCache`]: Optional device → tunnel ID cache

pub mod control_plane;
pub mod tunnel_cache;

pub use control_plane::{
    CnameSpec, ControlPlane, CreateTunnelResult, DnsRecord, FindTunnelResult,
};
pub use tunnel_cache::{CacheEntry, TunnelCache};
