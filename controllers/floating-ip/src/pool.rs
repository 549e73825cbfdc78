//! Floating IP pool queries and address selection

use crate::error::ControllerError;
use crate::retry::{RetryOutcome, TransientRetryPolicy};
use nova_client::{ComputeClientTrait, FloatingIp, NovaError};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

/// Read-only view of the floating IP pool
pub struct AddressPool<'a> {
    client: &'a dyn ComputeClientTrait,
}

impl<'a> AddressPool<'a> {
    pub fn new(client: &'a dyn ComputeClientTrait) -> Self {
        Self { client }
    }

    /// Every address not bound to any instance
    pub async fn list_unassigned(&self) -> Result<Vec<FloatingIp>, NovaError> {
        let unassigned: Vec<FloatingIp> = self
            .client
            .list_floating_ips()
            .await?
            .into_iter()
            .filter(FloatingIp::is_available)
            .collect();
        debug!("{} unassigned floating IPs in pool", unassigned.len());
        Ok(unassigned)
    }

    /// Single-shot lookup of the address bound to `server_id`
    ///
    /// An instance should own at most one address. If the listing shows more,
    /// the first is reported and the rest are logged.
    pub async fn find_assigned(&self, server_id: &str) -> Result<Option<FloatingIp>, NovaError> {
        let mut owned = self
            .client
            .list_floating_ips()
            .await?
            .into_iter()
            .filter(|f| f.is_assigned_to(server_id));

        let first = owned.next();
        let extra: Vec<String> = owned.map(|f| f.ip).collect();
        if !extra.is_empty() {
            warn!(
                "Instance {} owns more than one floating IP; using {:?}, ignoring {:?}",
                server_id,
                first.as_ref().map(|f| f.ip.as_str()),
                extra
            );
        }
        Ok(first)
    }

    /// `find_assigned` under a retry policy, for reads that may lag a mutation
    pub async fn confirm_assigned(
        &self,
        policy: &TransientRetryPolicy,
        server_id: &str,
    ) -> RetryOutcome<FloatingIp> {
        policy
            .run("confirm_assigned", || self.find_assigned(server_id))
            .await
    }
}

/// Picks an unassigned address, allocating one into the pool when none is free
pub struct AddressSelector<R: Rng> {
    pool_name: String,
    rng: R,
}

impl<R: Rng> AddressSelector<R> {
    pub fn new(pool_name: impl Into<String>, rng: R) -> Self {
        Self {
            pool_name: pool_name.into(),
            rng,
        }
    }

    /// Choose an address for `vm_name`
    ///
    /// The choice is uniform over the unassigned addresses so concurrent
    /// callers rarely contend for the same one. No retry happens here; the
    /// caller's outer loop absorbs failures.
    pub async fn select(
        &mut self,
        pool: &AddressPool<'_>,
        vm_name: &str,
    ) -> Result<FloatingIp, ControllerError> {
        let mut candidates = pool.list_unassigned().await?;

        if candidates.is_empty() {
            info!(
                "No unassigned floating IP for {}; allocating one from pool {}",
                vm_name, self.pool_name
            );
            match pool.client.allocate_floating_ip(&self.pool_name).await {
                Ok(allocated) => info!("Allocated floating IP {}", allocated.ip),
                Err(e) => {
                    warn!("Allocation from pool {} refused: {}", self.pool_name, e);
                    return Err(ControllerError::AddressNotAvailable(vm_name.to_string()));
                }
            }
            candidates = pool.list_unassigned().await?;
        }

        let chosen = candidates
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| ControllerError::AddressNotAvailable(vm_name.to_string()))?;

        info!(
            "Selected floating IP {} for {} out of {} candidates",
            chosen.ip,
            vm_name,
            candidates.len()
        );
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_client::{MockComputeClient, ServerStatus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    const POOL: &str = "vlan_690_network";

    fn selector() -> AddressSelector<StdRng> {
        AddressSelector::new(POOL, StdRng::seed_from_u64(7))
    }

    #[tokio::test]
    async fn test_selector_never_returns_owned_address() {
        let mock = MockComputeClient::new("http://nova");
        let owner = mock.add_server("web2", &[ServerStatus::Active]);
        mock.add_floating_ip_record(POOL, "10.0.0.9", Some(&owner));
        mock.add_floating_ip_record(POOL, "10.0.0.5", None);
        mock.add_floating_ip_record(POOL, "10.0.0.6", Some(&owner));

        let pool = AddressPool::new(&mock);
        let mut selector = selector();
        for _ in 0..20 {
            let chosen = selector.select(&pool, "web1").await.unwrap();
            assert_eq!(chosen.ip, "10.0.0.5");
        }
        assert!(mock.calls().allocations.is_empty());
    }

    #[tokio::test]
    async fn test_selector_spreads_over_candidates() {
        let mock = MockComputeClient::new("http://nova");
        for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"] {
            mock.add_floating_ip_record(POOL, ip, None);
        }

        let pool = AddressPool::new(&mock);
        let mut selector = selector();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            seen.insert(selector.select(&pool, "web1").await.unwrap().ip);
        }
        assert!(seen.len() > 1);
    }

    #[tokio::test]
    async fn test_empty_pool_allocates_then_selects() {
        let mock = MockComputeClient::new("http://nova");
        mock.set_allocatable(POOL, &["10.0.0.7"]);

        let pool = AddressPool::new(&mock);
        let chosen = selector().select(&pool, "web3").await.unwrap();

        assert_eq!(chosen.ip, "10.0.0.7");
        assert_eq!(mock.calls().allocations, vec![POOL.to_string()]);
    }

    #[tokio::test]
    async fn test_refused_allocation_is_address_not_available() {
        let mock = MockComputeClient::new("http://nova");
        mock.set_allocatable(POOL, &["10.0.0.7"]);
        mock.fail_next_allocations(1);

        let pool = AddressPool::new(&mock);
        let err = selector().select(&pool, "web3").await.unwrap_err();

        assert!(matches!(err, ControllerError::AddressNotAvailable(ref vm) if vm == "web3"));
    }

    #[tokio::test]
    async fn test_listing_failure_is_compute_error() {
        let mock = MockComputeClient::new("http://nova");
        mock.add_floating_ip_record(POOL, "10.0.0.5", None);
        mock.fail_next_lists(1);

        let pool = AddressPool::new(&mock);
        let err = selector().select(&pool, "web1").await.unwrap_err();

        assert!(matches!(err, ControllerError::Compute(_)));
    }

    #[tokio::test]
    async fn test_find_assigned_uses_first_of_several() {
        let mock = MockComputeClient::new("http://nova");
        let owner = mock.add_server("web1", &[ServerStatus::Active]);
        mock.add_floating_ip_record(POOL, "10.0.0.5", Some(&owner));
        mock.add_floating_ip_record(POOL, "10.0.0.6", Some(&owner));

        let pool = AddressPool::new(&mock);
        let found = pool.find_assigned(&owner).await.unwrap();

        assert_eq!(found.map(|f| f.ip), Some("10.0.0.5".to_string()));
        assert!(pool.find_assigned("srv-other").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_assigned_absorbs_transient_list_errors() {
        let mock = MockComputeClient::new("http://nova");
        let owner = mock.add_server("web1", &[ServerStatus::Active]);
        mock.add_floating_ip_record(POOL, "10.0.0.5", Some(&owner));
        mock.fail_next_lists(2);

        let pool = AddressPool::new(&mock);
        let policy = TransientRetryPolicy::new(7, 3, Duration::from_secs(3));
        let outcome = pool.confirm_assigned(&policy, &owner).await;

        assert_eq!(outcome.found().map(|f| f.ip), Some("10.0.0.5".to_string()));
        assert_eq!(mock.calls().floating_ip_lists, 3);
    }
}
