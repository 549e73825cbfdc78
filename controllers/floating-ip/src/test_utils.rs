//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating mock control planes and
//! reconcilers with deterministic address selection.

use crate::config::Settings;
use crate::reconciler::Reconciler;
use nova_client::{MockComputeClient, ServerStatus};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Pool used by every test scenario
pub const TEST_POOL: &str = "vlan_690_network";

/// Helper to create an empty mock compute API
pub fn create_mock() -> MockComputeClient {
    MockComputeClient::new("http://nova.test:8774/v2/tenant-1")
}

/// Helper to create a mock with one instance and the given free addresses
pub fn create_mock_with_instance(
    vm_name: &str,
    statuses: &[ServerStatus],
    free: &[&str],
) -> (MockComputeClient, String) {
    let mock = create_mock();
    let server_id = mock.add_server(vm_name, statuses);
    for ip in free {
        mock.add_floating_ip_record(TEST_POOL, ip, None);
    }
    (mock, server_id)
}

/// Helper to create a reconciler sharing state with `mock`
pub fn create_test_reconciler(mock: &MockComputeClient) -> Reconciler<StdRng> {
    create_test_reconciler_with_seed(mock, 42)
}

/// Same as `create_test_reconciler` with an explicit selection seed
pub fn create_test_reconciler_with_seed(mock: &MockComputeClient, seed: u64) -> Reconciler<StdRng> {
    Reconciler::with_rng(
        Box::new(mock.clone()),
        Settings::default(),
        StdRng::seed_from_u64(seed),
    )
}
