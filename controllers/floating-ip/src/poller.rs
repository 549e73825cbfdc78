//! Lifecycle polling
//!
//! Waits for an instance to leave its transitional states. Existence is
//! assumed stable, so a missing instance ends the wait at once; the status is
//! not, so every iteration fetches a fresh record.

use crate::error::ControllerError;
use nova_client::{ComputeClientTrait, NovaError, Server};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed-interval poll with a hard attempt ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePoller {
    max_attempts: u32,
    interval: Duration,
}

impl LifecyclePoller {
    /// The instance is always queried at least once, even for a zero ceiling
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Poll until the instance is ACTIVE or ERROR, or the ceiling is reached
    ///
    /// # Returns
    /// * `Ok(Server)` - The terminal record, or the last non-terminal record seen
    ///   when the ceiling was reached. Callers decide what "not ready" means.
    /// * `Err(ControllerError::InstanceNotFound)` - The instance does not exist
    /// * `Err(ControllerError::Compute)` - Every poll failed, so no record was ever seen
    pub async fn wait_for_terminal(
        &self,
        client: &dyn ComputeClientTrait,
        vm_name: &str,
    ) -> Result<Server, ControllerError> {
        info!("Waiting for instance {} to become active", vm_name);

        let mut last_seen: Option<Server> = None;
        let mut last_error: Option<NovaError> = None;

        for attempt in 1..=self.max_attempts {
            match client.find_server(vm_name).await {
                Ok(None) => {
                    warn!("Instance {} not found", vm_name);
                    return Err(ControllerError::InstanceNotFound(vm_name.to_string()));
                }
                Ok(Some(server)) if server.is_terminal() => {
                    info!("Instance {} reached status {} after {} polls", vm_name, server.status, attempt);
                    return Ok(server);
                }
                Ok(Some(server)) => {
                    debug!(
                        "Instance {} status {} (poll {}/{})",
                        vm_name, server.status, attempt, self.max_attempts
                    );
                    last_seen = Some(server);
                }
                Err(e) => {
                    warn!("Failed to query instance {} (poll {}/{}): {}", vm_name, attempt, self.max_attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        match (last_seen, last_error) {
            (Some(server), _) => {
                warn!(
                    "Timed out waiting for instance {}; last status {}",
                    vm_name, server.status
                );
                Ok(server)
            }
            (None, last_error) => Err(ControllerError::Compute(last_error.unwrap_or_else(|| {
                NovaError::Api(format!("No status observed for instance {}", vm_name))
            }))),
        }
    }
}
