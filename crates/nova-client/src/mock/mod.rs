//! Mock ComputeClient for unit testing
//!
//! This module provides a mock implementation of ComputeClientTrait that can be used
//! in unit tests without a running OpenStack deployment.
//!
//! The mock is organized into domain-specific modules:
//! - `servers.rs` - server lookup, with scripted lifecycle status sequences
//! - `floating_ips.rs` - the floating IP pool, allocation and binding
//!
//! Besides in-memory state it can inject the behaviors of an eventually
//! consistent control plane: transient query failures, stale listings after a
//! bind, binds that are accepted but never applied, and binds that land on a
//! different address than requested.

mod floating_ips;
mod servers;

use crate::compute_trait::ComputeClientTrait;
use crate::error::NovaError;
use crate::models::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Fault injection counters; each counter is consumed by the matching call
#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub(crate) server_lookup_failures: u32,
    pub(crate) list_failures: u32,
    pub(crate) allocation_failures: u32,
    pub(crate) bind_failures: u32,
    pub(crate) dropped_binds: u32,
    pub(crate) bind_redirect: Option<String>,
    pub(crate) listing_lag: u32,
    pub(crate) failing_releases: HashSet<String>,
}

/// Pre-bind listing served while a bind is still "propagating"
#[derive(Debug, Default)]
pub(crate) struct StaleView {
    pub(crate) snapshot: Vec<FloatingIp>,
    pub(crate) remaining: u32,
}

/// Mutations observed by the mock, for assertions
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    /// (server id, requested address) for every bind request that reached the mock
    pub binds: Vec<(String, String)>,
    /// (server id, address) for every unbind request
    pub unbinds: Vec<(String, String)>,
    /// Pool names of every allocation request
    pub allocations: Vec<String>,
    /// Floating IP ids of every successful release
    pub releases: Vec<String>,
    pub server_lookups: u32,
    pub floating_ip_lists: u32,
}

/// Mock ComputeClient for testing
///
/// Clones share state, so two reconcilers can contend for the same pool.
#[derive(Clone)]
pub struct MockComputeClient {
    pub(crate) endpoint: String,
    pub(crate) servers: Arc<Mutex<HashMap<String, Server>>>,
    pub(crate) status_scripts: Arc<Mutex<HashMap<String, VecDeque<ServerStatus>>>>,
    pub(crate) floating_ips: Arc<Mutex<Vec<FloatingIp>>>,
    pub(crate) allocatable: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    pub(crate) faults: Arc<Mutex<Faults>>,
    pub(crate) stale: Arc<Mutex<StaleView>>,
    pub(crate) calls: Arc<Mutex<CallLog>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockComputeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockComputeClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl MockComputeClient {
    /// Create a new mock client
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            servers: Arc::new(Mutex::new(HashMap::new())),
            status_scripts: Arc::new(Mutex::new(HashMap::new())),
            floating_ips: Arc::new(Mutex::new(Vec::new())),
            allocatable: Arc::new(Mutex::new(HashMap::new())),
            faults: Arc::new(Mutex::new(Faults::default())),
            stale: Arc::new(Mutex::new(StaleView::default())),
            calls: Arc::new(Mutex::new(CallLog::default())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a server whose status walks through `statuses`, one per lookup,
    /// then stays on the last one. Returns the generated server id.
    pub fn add_server(&self, name: &str, statuses: &[ServerStatus]) -> String {
        let id = format!("srv-{}", self.next_id());
        let mut script: VecDeque<ServerStatus> = statuses.iter().copied().collect();
        if script.is_empty() {
            script.push_back(ServerStatus::Active);
        }
        let server = Server {
            id: id.clone(),
            name: name.to_string(),
            status: script[0],
            tenant_id: Some("tenant-1".to_string()),
            updated: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.servers.lock().unwrap().insert(id.clone(), server);
        self.status_scripts.lock().unwrap().insert(id.clone(), script);
        id
    }

    /// Add a floating IP to the pool, optionally already bound to `owner` (a server id)
    pub fn add_floating_ip_record(&self, pool: &str, ip: &str, owner: Option<&str>) -> FloatingIp {
        let record = FloatingIp {
            id: self.next_id().to_string(),
            ip: ip.to_string(),
            pool: pool.to_string(),
            instance_id: owner.map(str::to_string),
            fixed_ip: owner.map(|_| "192.168.0.10".to_string()),
        };
        self.floating_ips.lock().unwrap().push(record.clone());
        record
    }

    /// Addresses handed out, in order, by `allocate_floating_ip(pool)`
    pub fn set_allocatable(&self, pool: &str, addresses: &[&str]) {
        self.allocatable.lock().unwrap().insert(
            pool.to_string(),
            addresses.iter().map(|a| (*a).to_string()).collect(),
        );
    }

    /// Fail the next `n` server lookups with a transient error
    pub fn fail_next_server_lookups(&self, n: u32) {
        self.faults.lock().unwrap().server_lookup_failures = n;
    }

    /// Fail the next `n` floating IP listings with a transient error
    pub fn fail_next_lists(&self, n: u32) {
        self.faults.lock().unwrap().list_failures = n;
    }

    /// Fail the next `n` allocation requests
    pub fn fail_next_allocations(&self, n: u32) {
        self.faults.lock().unwrap().allocation_failures = n;
    }

    /// Reject the next `n` bind requests
    pub fn fail_next_binds(&self, n: u32) {
        self.faults.lock().unwrap().bind_failures = n;
    }

    /// Accept the next `n` bind requests without ever applying them
    pub fn drop_next_binds(&self, n: u32) {
        self.faults.lock().unwrap().dropped_binds = n;
    }

    /// Apply the next bind to `address` instead of the requested one.
    /// The address is added to the pool if it is not there yet.
    pub fn redirect_next_bind(&self, address: &str) {
        self.faults.lock().unwrap().bind_redirect = Some(address.to_string());
    }

    /// After each applied bind, serve the pre-bind listing for `n` more listings
    pub fn set_listing_lag(&self, n: u32) {
        self.faults.lock().unwrap().listing_lag = n;
    }

    /// Make releasing the given floating IP id fail
    pub fn fail_release_of(&self, id: &str) {
        self.faults.lock().unwrap().failing_releases.insert(id.to_string());
    }

    /// Current pool contents (ignores listing lag)
    pub fn floating_ip_snapshot(&self) -> Vec<FloatingIp> {
        self.floating_ips.lock().unwrap().clone()
    }

    /// Address currently bound to the server (ignores listing lag)
    pub fn bound_address(&self, server_id: &str) -> Option<String> {
        self.floating_ips
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.is_assigned_to(server_id))
            .map(|f| f.ip.clone())
    }

    /// Mutations and lookups seen so far
    pub fn calls(&self) -> CallLog {
        self.calls.lock().unwrap().clone()
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl ComputeClientTrait for MockComputeClient {
    // Servers - delegated to servers module
    async fn find_server(&self, name_or_id: &str) -> Result<Option<Server>, NovaError> {
        servers::find_server(self, name_or_id).await
    }

    // Floating IPs - delegated to floating_ips module
    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NovaError> {
        floating_ips::list_floating_ips(self).await
    }

    async fn allocate_floating_ip(&self, pool: &str) -> Result<FloatingIp, NovaError> {
        floating_ips::allocate_floating_ip(self, pool).await
    }

    async fn release_floating_ip(&self, id: &str) -> Result<(), NovaError> {
        floating_ips::release_floating_ip(self, id).await
    }

    async fn add_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError> {
        floating_ips::add_floating_ip(self, server_id, address).await
    }

    async fn remove_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError> {
        floating_ips::remove_floating_ip(self, server_id, address).await
    }
}
