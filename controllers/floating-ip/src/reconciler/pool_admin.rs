//! Deassociation and pool administration

use super::Reconciler;
use crate::error::ControllerError;
use crate::janitor::{self, JanitorReport};
use nova_client::FloatingIp;
use rand::Rng;
use tracing::{info, warn};

/// Result of a legacy release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub instance: String,
    pub address: String,
    /// `None` when the janitor could not list the pool
    pub janitor: Option<JanitorReport>,
}

impl<R: Rng> Reconciler<R> {
    /// Deassociation is a no-op: the address stays bound and the call succeeds.
    pub async fn deassociate(&self, vm_name: &str) -> Result<(), ControllerError> {
        info!("Deassociate requested for {}; leaving its floating IP in place", vm_name);
        Ok(())
    }

    /// Unbind the instance's address, then release every idle address.
    ///
    /// Janitor failures are logged and reported, never returned as errors.
    pub async fn release_association(&self, vm_name: &str) -> Result<Release, ControllerError> {
        let server = self.require_server(vm_name).await?;
        let assigned = self
            .pool()
            .find_assigned(&server.id)
            .await?
            .ok_or_else(|| ControllerError::NotAssociated(vm_name.to_string()))?;

        info!("Removing floating IP {} from instance {}", assigned.ip, vm_name);
        self.client.remove_floating_ip(&server.id, &assigned.ip).await?;

        let janitor = match janitor::release_unassigned(self.client.as_ref()).await {
            Ok(report) => {
                if !report.failed.is_empty() {
                    warn!("{} floating IPs could not be released", report.failed.len());
                }
                Some(report)
            }
            Err(e) => {
                warn!("Skipping pool cleanup, listing failed: {}", e);
                None
            }
        };

        Ok(Release {
            instance: vm_name.to_string(),
            address: assigned.ip,
            janitor,
        })
    }

    /// Allocate one address into the configured pool
    pub async fn allocate(&self) -> Result<FloatingIp, ControllerError> {
        let allocated = self.client.allocate_floating_ip(&self.settings.pool_name).await?;
        info!("Allocated floating IP {} in pool {}", allocated.ip, allocated.pool);
        Ok(allocated)
    }

    /// Release every unassigned address
    pub async fn deallocate(&self) -> Result<JanitorReport, ControllerError> {
        Ok(janitor::release_unassigned(self.client.as_ref()).await?)
    }
}
