//! ComputeClient trait for mocking
//!
//! This trait abstracts the ComputeClient to enable mocking in unit tests.
//! The concrete ComputeClient implements this trait, and tests use `MockComputeClient`.

use crate::error::NovaError;
use crate::models::*;

/// Trait for compute API operations used by floating IP reconciliation
///
/// All async methods must be `Send` to work with Tokio's runtime.
#[async_trait::async_trait]
pub trait ComputeClientTrait: Send + Sync {
    // Servers
    /// Find a server by exact name, falling back to id. `Ok(None)` when no server matches.
    async fn find_server(&self, name_or_id: &str) -> Result<Option<Server>, NovaError>;

    // Floating IPs
    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NovaError>;
    async fn allocate_floating_ip(&self, pool: &str) -> Result<FloatingIp, NovaError>;
    async fn release_floating_ip(&self, id: &str) -> Result<(), NovaError>;
    async fn add_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError>;
    async fn remove_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError>;
}
