//! Reconciliation logic for floating IP associations.
//!
//! This module is organized by command family:
//! - `associate`: the bind flow (await active, check, select, bind, confirm)
//! - `inspect`: read-only queries (`displayassociated`, `isactive`)
//! - `pool_admin`: deassociation and pool administration

pub mod associate;
pub mod inspect;
pub mod pool_admin;

pub use associate::Association;
pub use pool_admin::Release;

use crate::config::Settings;
use crate::error::ControllerError;
use crate::pool::{AddressPool, AddressSelector};
use nova_client::{ComputeClientTrait, Server};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Drives one instance's floating IP toward the requested state.
pub struct Reconciler<R: Rng = StdRng> {
    pub(crate) client: Box<dyn ComputeClientTrait + Send + Sync>,
    pub(crate) settings: Settings,
    pub(crate) selector: AddressSelector<R>,
}

impl Reconciler {
    /// Creates a reconciler whose address choice is seeded from OS entropy.
    pub fn new(client: Box<dyn ComputeClientTrait + Send + Sync>, settings: Settings) -> Self {
        Self::with_rng(client, settings, StdRng::from_entropy())
    }
}

impl<R: Rng> Reconciler<R> {
    /// Creates a reconciler with an explicit RNG for address selection.
    pub fn with_rng(
        client: Box<dyn ComputeClientTrait + Send + Sync>,
        settings: Settings,
        rng: R,
    ) -> Self {
        let selector = AddressSelector::new(settings.pool_name.clone(), rng);
        Self {
            client,
            settings,
            selector,
        }
    }

    pub(crate) fn pool(&self) -> AddressPool<'_> {
        AddressPool::new(self.client.as_ref())
    }

    /// Single lookup by name; a missing instance is `InstanceNotFound`.
    pub(crate) async fn require_server(&self, vm_name: &str) -> Result<Server, ControllerError> {
        self.client
            .find_server(vm_name)
            .await?
            .ok_or_else(|| ControllerError::InstanceNotFound(vm_name.to_string()))
    }
}
