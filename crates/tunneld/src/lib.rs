// # tunneld
//
// Thin HTTP layer over `tunnel-core`.
//
// - Reads configuration once at start-up (see `settings`)
// - Builds the Cloudflare control plane, the optional cache and the provisioner
// - Maps requests onto `Provisioner::provision` and core errors onto HTTP
//
// No provisioning logic lives here.

pub mod error;
pub mod routes;
pub mod settings;

use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use tunnel_core::{ConfigKey, MacPolicy, ProvisionConfig, Provisioner, open_cache};
use tunnel_provider_cloudflare::CloudflareControlPlane;

/// Shared handler state
///
/// `provisioner` is `None` exactly when required configuration is missing;
/// `/provision` then answers 500 and `/health` lists `missing`.
#[derive(Clone)]
pub struct AppState {
    pub provisioner: Option<Arc<Provisioner>>,
    pub missing: Vec<ConfigKey>,
    pub mac_policy: MacPolicy,
}

impl AppState {
    /// Build the state for `config`
    ///
    /// # Errors
    ///
    /// Fails if the configuration is complete but cannot be used (bad API
    /// base, unreadable cache file).
    pub async fn from_config(config: &ProvisionConfig) -> tunnel_core::Result<Self> {
        let missing = config.missing();
        if !missing.is_empty() {
            warn!(
                "Required configuration missing: {}",
                missing
                    .iter()
                    .map(ConfigKey::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return Ok(Self {
                provisioner: None,
                missing,
                mac_policy: config.mac_policy,
            });
        }

        let control_plane = CloudflareControlPlane::from_config(config)?;
        let cache = open_cache(&config.cache).await?;
        info!(
            "Provisioner ready: base domain {}, cache {}",
            config.base_domain,
            config.cache.type_name()
        );

        let provisioner = Provisioner::new(Box::new(control_plane), cache, config)?;

        Ok(Self {
            provisioner: Some(Arc::new(provisioner)),
            missing,
            mac_policy: config.mac_policy,
        })
    }
}

/// The application router
pub fn app(state: AppState) -> Router {
    routes::router(state)
}
