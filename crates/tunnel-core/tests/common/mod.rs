//! Test doubles and common utilities for provisioning contract tests
//!
//! `FakeControlPlane` keeps tunnels, configurations and DNS records in
//! memory, records every call, and can be told to fail a given call.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tunnel_core::error::{Error, Result};
use tunnel_core::traits::{
    CnameSpec, ControlPlane, CreateTunnelResult, DnsRecord, FindTunnelResult, TunnelCache,
};
use tunnel_core::{DeviceId, MacPolicy, ProvisionConfig, Provisioner, TunnelConfig};

/// One kind of control-plane call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    FindTunnels,
    CreateTunnel,
    TunnelToken,
    TunnelConfig,
    PutTunnelConfig,
    FindCname,
    CreateCname,
    UpdateCname,
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::CreateTunnel | Call::PutTunnelConfig | Call::CreateCname | Call::UpdateCname
        )
    }
}

/// How an injected failure presents itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Non-success response from the provider
    Provider,
    /// Connection-level failure
    Transport,
}

#[derive(Default)]
struct State {
    tunnels: Vec<FindTunnelResult>,
    configs: HashMap<String, TunnelConfig>,
    records: Vec<DnsRecord>,
    calls: Vec<Call>,
    failures: HashMap<Call, Failure>,
    token_on_create: bool,
    token_override: Option<String>,
}

/// In-memory control plane that tracks calls
#[derive(Clone)]
pub struct FakeControlPlane {
    state: Arc<Mutex<State>>,
    next_id: Arc<AtomicUsize>,
}

impl FakeControlPlane {
    /// Fake whose create call returns a token (the usual provider behavior)
    pub fn new() -> Self {
        let fake = Self {
            state: Arc::new(Mutex::new(State::default())),
            next_id: Arc::new(AtomicUsize::new(1)),
        };
        fake.state.lock().unwrap().token_on_create = true;
        fake
    }

    /// Fake whose create call returns no token
    pub fn without_create_token() -> Self {
        let fake = Self::new();
        fake.state.lock().unwrap().token_on_create = false;
        fake
    }

    /// Make every call of kind `call` fail
    pub fn fail(&self, call: Call, failure: Failure) {
        self.state.lock().unwrap().failures.insert(call, failure);
    }

    /// Stop failing calls of kind `call`
    pub fn heal(&self, call: Call) {
        self.state.lock().unwrap().failures.remove(&call);
    }

    /// Return `token` from both create and token calls
    pub fn set_token(&self, token: impl Into<String>) {
        self.state.lock().unwrap().token_override = Some(token.into());
    }

    /// Seed an existing tunnel
    pub fn add_tunnel(&self, id: &str, name: &str) {
        self.state.lock().unwrap().tunnels.push(FindTunnelResult {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Seed a tunnel configuration
    pub fn set_config(&self, tunnel_id: &str, config: TunnelConfig) {
        self.state
            .lock()
            .unwrap()
            .configs
            .insert(tunnel_id.to_string(), config);
    }

    /// Seed a DNS record
    pub fn add_record(&self, id: &str, name: &str, content: &str, proxied: bool) {
        self.state.lock().unwrap().records.push(DnsRecord {
            id: id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            proxied,
        });
    }

    pub fn tunnels(&self) -> Vec<FindTunnelResult> {
        self.state.lock().unwrap().tunnels.clone()
    }

    pub fn config(&self, tunnel_id: &str) -> Option<TunnelConfig> {
        self.state.lock().unwrap().configs.get(tunnel_id).cloned()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.state.lock().unwrap().records.clone()
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls of kind `call`
    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    /// Number of mutating calls
    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_write()).count()
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn token_for(state: &State, tunnel_id: &str) -> String {
        state
            .token_override
            .clone()
            .unwrap_or_else(|| format!("eyJhIjoi{}-connector-token-000000", tunnel_id))
    }

    fn enter(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.get(&call).copied() {
            Some(Failure::Provider) => Err(Error::provider(
                "fake",
                format!("{:?} failed: 500 {{\"success\":false}}", call),
            )),
            Some(Failure::Transport) => Err(Error::http(format!("{:?}: connection refused", call))),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn find_tunnels(&self, name: &str) -> Result<Vec<FindTunnelResult>> {
        let state = self.enter(Call::FindTunnels)?;
        Ok(state
            .tunnels
            .iter()
            .filter(|t| t.name == name)
            .cloned()
            .collect())
    }

    async fn create_tunnel(&self, name: &str) -> Result<CreateTunnelResult> {
        let mut state = self.enter(Call::CreateTunnel)?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("{:08x}-0000-4000-8000-000000000000", n);
        state.tunnels.push(FindTunnelResult {
            id: id.clone(),
            name: name.to_string(),
        });
        let token = state
            .token_on_create
            .then(|| Self::token_for(&state, &id));
        Ok(CreateTunnelResult { id, token })
    }

    async fn tunnel_token(&self, tunnel_id: &str) -> Result<String> {
        let state = self.enter(Call::TunnelToken)?;
        Ok(Self::token_for(&state, tunnel_id))
    }

    async fn tunnel_config(&self, tunnel_id: &str) -> Result<TunnelConfig> {
        let state = self.enter(Call::TunnelConfig)?;
        Ok(state.configs.get(tunnel_id).cloned().unwrap_or_default())
    }

    async fn put_tunnel_config(&self, tunnel_id: &str, config: &TunnelConfig) -> Result<()> {
        let mut state = self.enter(Call::PutTunnelConfig)?;
        state.configs.insert(tunnel_id.to_string(), config.clone());
        Ok(())
    }

    async fn find_cname(&self, name: &str) -> Result<Option<DnsRecord>> {
        let state = self.enter(Call::FindCname)?;
        Ok(state.records.iter().find(|r| r.name == name).cloned())
    }

    async fn create_cname(&self, spec: &CnameSpec) -> Result<DnsRecord> {
        let mut state = self.enter(Call::CreateCname)?;
        let record = DnsRecord {
            id: format!("rec-{}", state.records.len() + 1),
            name: spec.name.clone(),
            content: spec.content.clone(),
            proxied: spec.proxied,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update_cname(&self, record_id: &str, spec: &CnameSpec) -> Result<DnsRecord> {
        let mut state = self.enter(Call::UpdateCname)?;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::provider("fake", format!("no record {}", record_id)))?;
        record.name = spec.name.clone();
        record.content = spec.content.clone();
        record.proxied = spec.proxied;
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// A cache that counts calls and can be made to fail
#[derive(Clone, Default)]
pub struct CountingCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
    get_calls: Arc<AtomicUsize>,
    put_calls: Arc<AtomicUsize>,
    broken: Arc<std::sync::atomic::AtomicBool>,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        let cache = Self::default();
        cache.broken.store(true, Ordering::SeqCst);
        cache
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn insert(&self, key: &str, tunnel_id: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), tunnel_id.to_string());
    }

    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl TunnelCache for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::cache("store unavailable"));
        }
        Ok(self.entry(key))
    }

    async fn put(&self, key: &str, tunnel_id: &str) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::cache("store unavailable"));
        }
        self.insert(key, tunnel_id);
        Ok(())
    }

    fn cache_name(&self) -> &'static str {
        "counting"
    }
}

/// Minimal valid configuration for tests
pub fn test_config() -> ProvisionConfig {
    ProvisionConfig::new("test-api-token", "test-account", "test-zone")
}

/// Provisioner over `fake` with no cache
pub fn provisioner(fake: &FakeControlPlane) -> Provisioner {
    Provisioner::new(Box::new(fake.clone()), None, &test_config())
        .expect("provisioner construction succeeds")
}

/// Provisioner over `fake` with `cache`
pub fn provisioner_with_cache(fake: &FakeControlPlane, cache: &CountingCache) -> Provisioner {
    Provisioner::new(
        Box::new(fake.clone()),
        Some(Arc::new(cache.clone())),
        &test_config(),
    )
    .expect("provisioner construction succeeds")
}

pub fn device(raw: &str) -> DeviceId {
    DeviceId::parse(raw, MacPolicy::Strip).expect("valid test MAC")
}
