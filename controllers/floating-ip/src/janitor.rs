//! Releases idle floating IPs back to the provider

use nova_client::{ComputeClientTrait, NovaError};
use tracing::{info, warn};

/// What a janitor pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JanitorReport {
    /// Addresses released
    pub released: Vec<String>,
    /// (address, reason) for every release that failed
    pub failed: Vec<(String, String)>,
}

/// Release every floating IP that is not bound to an instance
///
/// The pool is listed once. A failed release is recorded and the pass moves on
/// to the next address; only the initial listing failure is returned as an error.
pub async fn release_unassigned(client: &dyn ComputeClientTrait) -> Result<JanitorReport, NovaError> {
    let mut report = JanitorReport::default();

    for floating_ip in client.list_floating_ips().await? {
        if !floating_ip.is_available() {
            continue;
        }
        match client.release_floating_ip(&floating_ip.id).await {
            Ok(()) => {
                info!("Released floating IP {} (id {})", floating_ip.ip, floating_ip.id);
                report.released.push(floating_ip.ip);
            }
            Err(e) => {
                warn!("Failed to release floating IP {} (id {}): {}", floating_ip.ip, floating_ip.id, e);
                report.failed.push((floating_ip.ip, e.to_string()));
            }
        }
    }

    info!(
        "Janitor pass complete: {} released, {} failed",
        report.released.len(),
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_client::{MockComputeClient, ServerStatus};

    #[tokio::test]
    async fn test_releases_only_unowned_and_continues_past_failures() {
        let mock = MockComputeClient::new("http://nova");
        let owner = mock.add_server("web1", &[ServerStatus::Active]);
        mock.add_floating_ip_record("pool", "10.0.0.1", None);
        let stuck = mock.add_floating_ip_record("pool", "10.0.0.2", None);
        mock.add_floating_ip_record("pool", "10.0.0.3", Some(&owner));
        mock.add_floating_ip_record("pool", "10.0.0.4", None);
        mock.fail_release_of(&stuck.id);

        let report = release_unassigned(&mock).await.unwrap();

        assert_eq!(report.released, vec!["10.0.0.1".to_string(), "10.0.0.4".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "10.0.0.2");

        let remaining: Vec<String> = mock.floating_ip_snapshot().into_iter().map(|f| f.ip).collect();
        assert_eq!(remaining, vec!["10.0.0.2".to_string(), "10.0.0.3".to_string()]);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let mock = MockComputeClient::new("http://nova");
        mock.add_floating_ip_record("pool", "10.0.0.1", None);
        mock.fail_next_lists(1);

        assert!(release_unassigned(&mock).await.is_err());
        assert!(mock.calls().releases.is_empty());
    }
}
