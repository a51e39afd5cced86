// # Cloudflare Control Plane
//
// This crate implements the `ControlPlane` trait against the Cloudflare
// API v4: Cloudflare Tunnel (cfd_tunnel) for tunnels, tokens and remotely
// managed ingress, and zone DNS records for the device CNAME.
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (Control Plane)
//
// - ✅ One HTTP request per trait method
// - ✅ Responses decoded into explicit types right after each call
// - ✅ Full error propagation (the provisioner owns failure policy)
// - ✅ HTTP timeout configured (30 seconds)
// - ❌ NO retry or backoff
// - ❌ NO caching
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - List tunnels:       GET  `/accounts/:account_id/cfd_tunnel?name=...&is_deleted=false`
// - Create tunnel:      POST `/accounts/:account_id/cfd_tunnel`
// - Tunnel token:       GET  `/accounts/:account_id/cfd_tunnel/:tunnel_id/token`
// - Tunnel config:      GET/PUT `/accounts/:account_id/cfd_tunnel/:tunnel_id/configurations`
// - List DNS records:   GET  `/zones/:zone_id/dns_records?type=CNAME&name=...`
// - Create DNS record:  POST `/zones/:zone_id/dns_records`
// - Replace DNS record: PUT  `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use tunnel_core::config::{DEFAULT_API_BASE, ProvisionConfig};
use tunnel_core::traits::{
    CnameSpec, ControlPlane, CreateTunnelResult, DnsRecord, FindTunnelResult,
};
use tunnel_core::{Error, Result, TunnelConfig};

/// Provider name used in errors and logs
const PROVIDER: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare API response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// `result` of the tunnel configurations endpoint
#[derive(Debug, Deserialize)]
struct ConfigurationResult {
    #[serde(default)]
    config: Option<TunnelConfig>,
}

/// Cloudflare control plane
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareControlPlane {
    /// API base URL (no trailing slash)
    api_base: String,

    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Account owning the tunnels
    account_id: String,

    /// Zone holding the device records
    zone_id: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareControlPlane")
            .field("api_base", &self.api_base)
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

impl CloudflareControlPlane {
    /// Create a control plane for the public Cloudflare API
    ///
    /// # Parameters
    ///
    /// - `api_token`: token with Account:Cloudflare Tunnel:Edit and Zone:DNS:Edit
    /// - `account_id`: account owning the tunnels
    /// - `zone_id`: zone holding the device hostnames
    pub fn new(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token,
            account_id: account_id.into(),
            zone_id: zone_id.into(),
            client,
        })
    }

    /// Create a control plane from provisioning configuration
    pub fn from_config(config: &ProvisionConfig) -> Result<Self> {
        Ok(Self::new(
            config.api_token.clone(),
            config.account_id.clone(),
            config.zone_id.clone(),
        )?
        .with_api_base(&config.api_base))
    }

    /// Point the control plane at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn tunnels_url(&self) -> String {
        format!("{}/accounts/{}/cfd_tunnel", self.api_base, self.account_id)
    }

    fn tunnel_url(&self, tunnel_id: &str, suffix: &str) -> String {
        format!("{}/{}/{}", self.tunnels_url(), tunnel_id, suffix)
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }

    /// Send one request and unwrap the response envelope
    ///
    /// Fails with `Error::Http` if the request did not complete and with
    /// `Error::Provider` on a failure status, an unsuccessful envelope, or a
    /// body that does not decode. The raw body is kept in the error.
    async fn send<T: DeserializeOwned>(&self, op: &str, request: RequestBuilder) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: HTTP request failed: {}", op, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("{}: failed to read response: {}", op, e)))?;

        if !status.is_success() {
            tracing::debug!("{} failed with status {}", op, status);
            return Err(status_error(op, status, &body));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(
                PROVIDER,
                format!("{}: invalid response format: {} - {}", op, e, body),
            )
        })?;

        if !envelope.success {
            let messages = envelope
                .errors
                .iter()
                .map(|m| format!("[{}] {}", m.code, m.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::provider(
                PROVIDER,
                format!("{}: API reported failure: {} - {}", op, messages, body),
            ));
        }

        Ok(envelope.result)
    }

    /// Like [`send`](Self::send), but a missing `result` is an error
    async fn send_for_result<T: DeserializeOwned>(
        &self,
        op: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        self.send(op, request).await?.ok_or_else(|| {
            Error::provider(PROVIDER, format!("{}: response has no result", op))
        })
    }
}

/// Map a failure status to a provider error
fn status_error(op: &str, status: StatusCode, body: &str) -> Error {
    let message = match status.as_u16() {
        401 | 403 => format!(
            "{}: authentication failed: invalid API token or insufficient permissions. Status: {} - {}",
            op, status, body
        ),
        404 => format!("{}: not found. Status: {} - {}", op, status, body),
        409 => format!("{}: conflict. Status: {} - {}", op, status, body),
        429 => format!("{}: rate limit exceeded. Status: {} - {}", op, status, body),
        500..=599 => format!(
            "{}: Cloudflare server error (transient): {} - {}",
            op, status, body
        ),
        _ => format!("{}: failed: {} - {}", op, status, body),
    };
    Error::provider(PROVIDER, message)
}

#[async_trait]
impl ControlPlane for CloudflareControlPlane {
    async fn find_tunnels(&self, name: &str) -> Result<Vec<FindTunnelResult>> {
        tracing::debug!("Looking up tunnel by name: {}", name);

        let request = self
            .client
            .get(self.tunnels_url())
            .query(&[("name", name), ("is_deleted", "false")]);

        let tunnels: Vec<FindTunnelResult> = self
            .send("list tunnels", request)
            .await?
            .unwrap_or_default();

        // The name filter is trusted, but not blindly
        Ok(tunnels.into_iter().filter(|t| t.name == name).collect())
    }

    async fn create_tunnel(&self, name: &str) -> Result<CreateTunnelResult> {
        tracing::debug!("Creating tunnel: {}", name);

        let request = self.client.post(self.tunnels_url()).json(&serde_json::json!({
            "name": name,
            "config_src": "cloudflare",
        }));

        self.send_for_result("create tunnel", request).await
    }

    async fn tunnel_token(&self, tunnel_id: &str) -> Result<String> {
        tracing::debug!("Fetching token for tunnel: {}", tunnel_id);

        let request = self.client.get(self.tunnel_url(tunnel_id, "token"));
        self.send_for_result("fetch tunnel token", request).await
    }

    async fn tunnel_config(&self, tunnel_id: &str) -> Result<TunnelConfig> {
        let request = self
            .client
            .get(self.tunnel_url(tunnel_id, "configurations"));

        let result: Option<ConfigurationResult> =
            self.send("get tunnel configuration", request).await?;

        Ok(result.and_then(|r| r.config).unwrap_or_default())
    }

    async fn put_tunnel_config(&self, tunnel_id: &str, config: &TunnelConfig) -> Result<()> {
        tracing::debug!(
            "Writing {} ingress rule(s) for tunnel: {}",
            config.ingress.len(),
            tunnel_id
        );

        let request = self
            .client
            .put(self.tunnel_url(tunnel_id, "configurations"))
            .json(&serde_json::json!({ "config": config }));

        self.send::<serde_json::Value>("update tunnel configuration", request)
            .await?;
        Ok(())
    }

    async fn find_cname(&self, name: &str) -> Result<Option<DnsRecord>> {
        tracing::debug!("Looking up CNAME record: {}", name);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("type", "CNAME"), ("name", name)]);

        let records: Vec<DnsRecord> = self
            .send("list DNS records", request)
            .await?
            .unwrap_or_default();

        Ok(records.into_iter().next())
    }

    async fn create_cname(&self, spec: &CnameSpec) -> Result<DnsRecord> {
        let request = self.client.post(self.records_url()).json(spec);
        self.send_for_result("create DNS record", request).await
    }

    async fn update_cname(&self, record_id: &str, spec: &CnameSpec) -> Result<DnsRecord> {
        let request = self
            .client
            .put(format!("{}/{}", self.records_url(), record_id))
            .json(spec);
        self.send_for_result("update DNS record", request).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
