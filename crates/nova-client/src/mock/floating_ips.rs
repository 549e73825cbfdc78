//! Floating IP operations for MockComputeClient
//!
//! Handles the pool listing, allocation, release, and server bind/unbind actions.

use super::MockComputeClient;
use crate::error::NovaError;
use crate::models::*;

pub async fn list_floating_ips(client: &MockComputeClient) -> Result<Vec<FloatingIp>, NovaError> {
        let listing = read_listing(client);
        // The response is a snapshot; other callers may mutate the pool before it arrives
        tokio::task::yield_now().await;
        listing
}

fn read_listing(client: &MockComputeClient) -> Result<Vec<FloatingIp>, NovaError> {
        client.calls.lock().unwrap().floating_ip_lists += 1;
        {
            let mut faults = client.faults.lock().unwrap();
            if faults.list_failures > 0 {
                faults.list_failures -= 1;
                return Err(NovaError::Api("injected transient failure: GET /os-floating-ips".to_string()));
            }
        }

        {
            let mut stale = client.stale.lock().unwrap();
            if stale.remaining > 0 {
                stale.remaining -= 1;
                return Ok(stale.snapshot.clone());
            }
        }

        Ok(client.floating_ips.lock().unwrap().clone())
}

pub async fn allocate_floating_ip(client: &MockComputeClient, pool: &str) -> Result<FloatingIp, NovaError> {
        client.calls.lock().unwrap().allocations.push(pool.to_string());
        {
            let mut faults = client.faults.lock().unwrap();
            if faults.allocation_failures > 0 {
                faults.allocation_failures -= 1;
                return Err(NovaError::Api(format!("injected failure: allocate from pool {}", pool)));
            }
        }

        let address = client.allocatable
            .lock()
            .unwrap()
            .get_mut(pool)
            .and_then(|addresses| addresses.pop_front())
            .ok_or_else(|| NovaError::NotFound(format!("No more floating ips in pool {}", pool)))?;

        let record = FloatingIp {
            id: client.next_id().to_string(),
            ip: address,
            pool: pool.to_string(),
            instance_id: None,
            fixed_ip: None,
        };
        client.floating_ips.lock().unwrap().push(record.clone());
        Ok(record)
}

pub async fn release_floating_ip(client: &MockComputeClient, id: &str) -> Result<(), NovaError> {
        if client.faults.lock().unwrap().failing_releases.contains(id) {
            return Err(NovaError::Api(format!("injected failure: release floating IP {}", id)));
        }

        let mut ips = client.floating_ips.lock().unwrap();
        let before = ips.len();
        ips.retain(|f| f.id != id);
        if ips.len() == before {
            return Err(NovaError::NotFound(format!("Floating IP {} not found", id)));
        }

        client.calls.lock().unwrap().releases.push(id.to_string());
        Ok(())
}

pub async fn add_floating_ip(client: &MockComputeClient, server_id: &str, address: &str) -> Result<(), NovaError> {
        client.calls
            .lock()
            .unwrap()
            .binds
            .push((server_id.to_string(), address.to_string()));

        let (redirect, lag) = {
            let mut faults = client.faults.lock().unwrap();
            if faults.bind_failures > 0 {
                faults.bind_failures -= 1;
                return Err(NovaError::Api(format!("injected failure: add floating IP {}", address)));
            }
            if faults.dropped_binds > 0 {
                faults.dropped_binds -= 1;
                return Ok(());
            }
            (faults.bind_redirect.take(), faults.listing_lag)
        };

        if !client.servers.lock().unwrap().contains_key(server_id) {
            return Err(NovaError::NotFound(format!("Server {} not found", server_id)));
        }

        let redirected = redirect.is_some();
        let target = redirect.unwrap_or_else(|| address.to_string());
        let mut ips = client.floating_ips.lock().unwrap();
        let pre_bind = ips.clone();

        if redirected && !ips.iter().any(|f| f.ip == target) {
            ips.push(FloatingIp {
                id: client.next_id().to_string(),
                ip: target.clone(),
                pool: "redirected".to_string(),
                instance_id: None,
                fixed_ip: None,
            });
        }

        let record = ips
            .iter_mut()
            .find(|f| f.ip == target)
            .ok_or_else(|| NovaError::NotFound(format!("Floating IP {} not found", target)))?;

        if let Some(owner) = &record.instance_id {
            return Err(NovaError::Conflict(format!(
                "Floating IP {} is already associated with instance {}",
                target, owner
            )));
        }

        record.instance_id = Some(server_id.to_string());
        record.fixed_ip = Some("192.168.0.10".to_string());

        if lag > 0 {
            let mut stale = client.stale.lock().unwrap();
            stale.snapshot = pre_bind;
            stale.remaining = lag;
        }
        Ok(())
}

pub async fn remove_floating_ip(client: &MockComputeClient, server_id: &str, address: &str) -> Result<(), NovaError> {
        client.calls
            .lock()
            .unwrap()
            .unbinds
            .push((server_id.to_string(), address.to_string()));

        let mut ips = client.floating_ips.lock().unwrap();
        let record = ips
            .iter_mut()
            .find(|f| f.ip == address && f.is_assigned_to(server_id))
            .ok_or_else(|| NovaError::Api(format!(
                "Floating IP {} is not associated with server {}",
                address, server_id
            )))?;

        record.instance_id = None;
        record.fixed_ip = None;
        Ok(())
}
