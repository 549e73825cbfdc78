//! Association flow
//!
//! START -> AWAIT_ACTIVE -> CHECK_NOT_ASSOCIATED -> SELECT_ADDRESS ->
//! REQUEST_BIND -> CONFIRM -> {SUCCESS, RETRY_ATTEMPT, FAILED}
//!
//! A bind request is issued once per outer attempt and never rolled back. A
//! later attempt may pick a different address.

use super::Reconciler;
use crate::backoff::EscalatingBackoff;
use crate::error::ControllerError;
use crate::poller::LifecyclePoller;
use crate::pool::{AddressPool, AddressSelector};
use crate::retry::{RetryOutcome, TransientRetryPolicy};
use nova_client::{ComputeClientTrait, Server, ServerStatus};
use rand::Rng;
use std::time::Duration;
use tracing::{error, info, warn};

/// A confirmed association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub instance: String,
    pub server_id: String,
    /// Address named in the bind request
    pub requested: String,
    /// Address the control plane reports as bound
    pub observed: String,
}

impl Association {
    /// The control plane bound a different address than requested
    pub fn is_mismatch(&self) -> bool {
        self.requested != self.observed
    }
}

impl<R: Rng> Reconciler<R> {
    /// Bind a floating IP to `vm_name` and confirm the binding is visible.
    pub async fn associate(&mut self, vm_name: &str) -> Result<Association, ControllerError> {
        let timings = self.settings.timings.clone();
        info!("Associating a floating IP with instance {}", vm_name);

        let server = LifecyclePoller::new(timings.lifecycle_attempts, timings.lifecycle_interval)
            .wait_for_terminal(self.client.as_ref(), vm_name)
            .await?;
        if server.status != ServerStatus::Active {
            warn!("Instance {} is {}, not binding", vm_name, server.status);
            return Err(ControllerError::InstanceNotActive {
                instance: vm_name.to_string(),
                status: server.status,
            });
        }

        if let Some(existing) = self.pool().find_assigned(&server.id).await? {
            warn!("Instance {} already has floating IP {}", vm_name, existing.ip);
            return Err(ControllerError::AlreadyAssociated {
                instance: vm_name.to_string(),
                address: existing.ip,
            });
        }

        let policy = TransientRetryPolicy::new(
            timings.confirm_attempts,
            timings.confirm_max_errors,
            timings.confirm_interval,
        );
        let mut backoff = EscalatingBackoff::new(timings.backoff_base, timings.backoff_step);

        for attempt in 1..=timings.bind_attempts {
            info!("Association attempt {}/{} for {}", attempt, timings.bind_attempts, vm_name);

            let result = bind_and_confirm(
                self.client.as_ref(),
                &mut self.selector,
                &policy,
                &server,
                vm_name,
                timings.settle,
            )
            .await;

            match result {
                Ok(Some(association)) => {
                    info!(
                        "Floating IP {} associated with instance {} on attempt {}",
                        association.observed, vm_name, attempt
                    );
                    return Ok(association);
                }
                Ok(None) => {
                    warn!("Association for {} not confirmed on attempt {}", vm_name, attempt);
                }
                Err(e @ ControllerError::AddressNotAvailable(_)) => {
                    error!("{}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Association attempt {} for {} failed: {}", attempt, vm_name, e);
                }
            }

            if attempt < timings.bind_attempts {
                let delay = backoff.next_backoff();
                info!("Retrying association for {} in {:?}", vm_name, delay);
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            "Giving up on associating a floating IP with {} after {} attempts",
            vm_name, timings.bind_attempts
        );
        Err(ControllerError::AssociationNotConfirmed {
            instance: vm_name.to_string(),
            attempts: timings.bind_attempts,
        })
    }
}

/// One outer attempt: select, bind once, settle, confirm.
///
/// `Ok(None)` means the bind was sent but never showed up within the
/// confirmation budget.
async fn bind_and_confirm<R: Rng>(
    client: &dyn ComputeClientTrait,
    selector: &mut AddressSelector<R>,
    policy: &TransientRetryPolicy,
    server: &Server,
    vm_name: &str,
    settle: Duration,
) -> Result<Option<Association>, ControllerError> {
    let pool = AddressPool::new(client);
    let candidate = selector.select(&pool, vm_name).await?;

    info!("Requesting bind of {} to {} ({})", candidate.ip, vm_name, server.id);
    client.add_floating_ip(&server.id, &candidate.ip).await?;

    tokio::time::sleep(settle).await;

    match pool.confirm_assigned(policy, &server.id).await {
        RetryOutcome::Found(observed) => {
            let association = Association {
                instance: vm_name.to_string(),
                server_id: server.id.clone(),
                requested: candidate.ip,
                observed: observed.ip,
            };
            if association.is_mismatch() {
                warn!(
                    "Floating IP mismatch for {}: requested {}, observed {}",
                    vm_name, association.requested, association.observed
                );
            }
            Ok(Some(association))
        }
        RetryOutcome::Exhausted { attempts, errors } => {
            warn!(
                "Bind of {} to {} not visible after {} clean queries and {} failed ones",
                candidate.ip, vm_name, attempts, errors
            );
            Ok(None)
        }
    }
}
