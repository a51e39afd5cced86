//! HTTP routes
//!
//! | Method     | Path         | Handler            |
//! |------------|--------------|--------------------|
//! | GET        | `/health`    | [`health`]         |
//! | GET, POST  | `/provision` | [`provision_get`], [`provision_post`] |
//!
//! Every other path or method answers `404 {"error":"not_found"}`.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use tunnel_core::DeviceId;

use crate::AppState;
use crate::error::ApiError;

/// Body of `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub missing: Vec<String>,
}

/// Body of a successful `/provision`
#[derive(Debug, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub token: String,
    pub tunnel_id: String,
    pub hostname: String,
}

/// MAC carried in the query string or the JSON body
#[derive(Debug, Default, Deserialize)]
pub struct MacParam {
    pub mac: Option<String>,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health).fallback(not_found))
        .route(
            "/provision",
            get(provision_get).post(provision_post).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
}

/// Report which required configuration keys are absent
///
/// Only key names are returned, never values.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: state.missing.is_empty(),
        missing: state.missing.iter().map(|k| k.as_str().to_string()).collect(),
    })
}

/// `GET /provision?mac=...`
pub async fn provision_get(
    State(state): State<AppState>,
    query: Option<Query<MacParam>>,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let mac = query.and_then(|Query(q)| q.mac);
    provision(&state, mac.as_deref()).await
}

/// `POST /provision` with `{"mac": "..."}`
///
/// A body that is not a JSON object with a string `mac` counts as no MAC.
pub async fn provision_post(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let mac = serde_json::from_slice::<MacParam>(&body)
        .ok()
        .and_then(|p| p.mac);
    provision(&state, mac.as_deref()).await
}

async fn provision(
    state: &AppState,
    mac: Option<&str>,
) -> Result<Json<ProvisionResponse>, ApiError> {
    // Input first: a bad MAC is a 400 even when configuration is missing
    let device = DeviceId::parse_optional(mac, state.mac_policy)?;

    let provisioner = state
        .provisioner
        .as_ref()
        .ok_or_else(|| ApiError::Misconfigured(state.missing.clone()))?;

    let outcome = provisioner.provision(&device).await?;

    Ok(Json(ProvisionResponse {
        token: outcome.token,
        tunnel_id: outcome.tunnel_id,
        hostname: outcome.hostname,
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
