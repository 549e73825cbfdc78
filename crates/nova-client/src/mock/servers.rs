//! Server operations for MockComputeClient
//!
//! Every lookup advances the server's status script by one step.

use super::MockComputeClient;
use crate::error::NovaError;
use crate::models::*;

fn advance_status(client: &MockComputeClient, id: &str) -> Option<ServerStatus> {
    let mut scripts = client.status_scripts.lock().unwrap();
    let script = scripts.get_mut(id)?;
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().copied()
    }
}

fn take_lookup_failure(client: &MockComputeClient) -> Result<(), NovaError> {
    client.calls.lock().unwrap().server_lookups += 1;
    let mut faults = client.faults.lock().unwrap();
    if faults.server_lookup_failures > 0 {
        faults.server_lookup_failures -= 1;
        return Err(NovaError::Api("injected transient failure: GET /servers".to_string()));
    }
    Ok(())
}

fn snapshot(client: &MockComputeClient, id: &str) -> Option<Server> {
    let status = advance_status(client, id);
    let mut servers = client.servers.lock().unwrap();
    let server = servers.get_mut(id)?;
    if let Some(status) = status {
        server.status = status;
        server.updated = Some(chrono::Utc::now().to_rfc3339());
    }
    Some(server.clone())
}

pub async fn find_server(client: &MockComputeClient, name_or_id: &str) -> Result<Option<Server>, NovaError> {
        take_lookup_failure(client)?;

        let ids: Vec<String> = client.servers
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.name == name_or_id)
            .map(|s| s.id.clone())
            .collect();

        match ids.as_slice() {
            [id] => Ok(snapshot(client, id)),
            [] => Ok(snapshot(client, name_or_id)),
            many => Err(NovaError::InvalidRequest(format!(
                "{} servers are named {}",
                many.len(),
                name_or_id
            ))),
        }
}
