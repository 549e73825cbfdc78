//! Read-only queries. One snapshot each, no polling.

use super::Reconciler;
use crate::error::ControllerError;
use nova_client::{Server, ServerStatus};
use rand::Rng;
use tracing::info;

impl<R: Rng> Reconciler<R> {
    /// Address currently bound to `vm_name`
    pub async fn display_associated(&self, vm_name: &str) -> Result<String, ControllerError> {
        let server = self.require_server(vm_name).await?;
        let assigned = self
            .pool()
            .find_assigned(&server.id)
            .await?
            .ok_or_else(|| ControllerError::NotAssociated(vm_name.to_string()))?;

        info!("Found floating IP {} for instance {}", assigned.ip, vm_name);
        Ok(assigned.ip)
    }

    /// Succeeds only if `vm_name` is ACTIVE right now
    pub async fn check_active(&self, vm_name: &str) -> Result<Server, ControllerError> {
        let server = self.require_server(vm_name).await?;
        info!("Instance {} status is {}", vm_name, server.status);

        match server.status {
            ServerStatus::Active => Ok(server),
            ServerStatus::Error => Err(ControllerError::InstanceInError(vm_name.to_string())),
            status => Err(ControllerError::InstanceNotActive {
                instance: vm_name.to_string(),
                status,
            }),
        }
    }
}
