// # tunnel-core
//
// Core library for MAC-keyed tunnel provisioning.
//
// ## Architecture Overview
//
// Given a device MAC, this library idempotently brings four remote
// resources into the desired state:
// - **Tunnel**: found or created, named after the device
// - **Connector token**: taken from creation or fetched
// - **Ingress route**: `<device>.<base domain>` → local service
// - **DNS record**: proxied CNAME `<device>.<base domain>` → tunnel
//
// Building blocks:
// - **DeviceId**: Normalized 12-hex-digit identity
// - **ControlPlane**: Trait for the provider API (tunnels, config, DNS)
// - **TunnelCache**: Optional device → tunnel ID cache
// - **Provisioner**: Sequences the steps against a ControlPlane
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Orchestration is separate from the provider API
// 2. **Explicit Configuration**: Config is built once and passed in, never read ambiently
// 3. **Idempotency**: Every step is find-or-create or upsert; repeating a request is safe
// 4. **Fail Fast**: The first failing call aborts the request, nothing is retried

pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod ingress;
pub mod provision;
pub mod traits;

// Re-export core types for convenience
pub use cache::{FileTunnelCache, MemoryTunnelCache, open_cache};
pub use config::{CacheConfig, ConfigKey, ProvisionConfig};
pub use device::{DeviceId, MacError, MacPolicy};
pub use error::{Error, Result};
pub use ingress::{IngressRule, RouteChange, TunnelConfig};
pub use provision::{DnsChange, ProvisionOutcome, Provisioner, ResolvedTunnel, TunnelSource};
pub use traits::{ControlPlane, TunnelCache};
