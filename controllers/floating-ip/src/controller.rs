//! Command dispatch.
//!
//! This module maps one parsed `Command` onto the reconciler and turns the
//! result into an `Outcome` that `main` can print and exit with.

use crate::config::Command;
use crate::error::{exit_code, ControllerError};
use crate::janitor::JanitorReport;
use crate::reconciler::{Association, Reconciler, Release};
use nova_client::{FloatingIp, Server};
use rand::Rng;
use serde_json::Value;
use tracing::info;

/// Message id carried by the `displayassociated` payload
pub const DISPLAY_MESSAGE_ID: &str = "OPSTX7832I";

/// What a successful command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Associated(Association),
    Deassociated,
    Released(Release),
    Displayed(DisplayPayload),
    Active(Server),
    Allocated(FloatingIp),
    Deallocated(JanitorReport),
}

impl Outcome {
    /// Text for stdout, if the command prints anything
    pub fn stdout(&self) -> Option<String> {
        match self {
            Self::Displayed(payload) => Some(payload.render()),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        exit_code::SUCCESS
    }
}

/// One-line result of `displayassociated`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPayload {
    pub rc: u8,
    pub ip: String,
    pub msg: String,
}

impl DisplayPayload {
    pub fn found(ip: String, vm_name: &str) -> Self {
        let msg = format!("{}: Found floating IP {} for VM {}", DISPLAY_MESSAGE_ID, ip, vm_name);
        Self { rc: exit_code::SUCCESS, ip, msg }
    }

    /// `{ "rc": 0, "ip": "...", "msg": "..." }`, with string values JSON-escaped
    pub fn render(&self) -> String {
        format!(
            "{{ \"rc\": {}, \"ip\": {}, \"msg\": {} }}",
            self.rc,
            Value::String(self.ip.clone()),
            Value::String(self.msg.clone())
        )
    }
}

/// Outcome of commands that never touch the control plane
///
/// Plain `deassociate` always succeeds, so it is answered before any
/// authentication is attempted.
pub fn resolve_locally(command: &Command) -> Option<Outcome> {
    match command {
        Command::Deassociate { vm_name, release: false } => {
            info!("Deassociate requested for {}; leaving its floating IP in place", vm_name);
            Some(Outcome::Deassociated)
        }
        _ => None,
    }
}

/// Run `command` to completion
pub async fn dispatch<R: Rng>(
    reconciler: &mut Reconciler<R>,
    command: &Command,
) -> Result<Outcome, ControllerError> {
    info!("Dispatching {}", command.action());

    let outcome = match command {
        Command::Associate { vm_name } => Outcome::Associated(reconciler.associate(vm_name).await?),
        Command::Deassociate { vm_name, release: false } => {
            reconciler.deassociate(vm_name).await?;
            Outcome::Deassociated
        }
        Command::Deassociate { vm_name, release: true } => {
            Outcome::Released(reconciler.release_association(vm_name).await?)
        }
        Command::DisplayAssociated { vm_name } => {
            let ip = reconciler.display_associated(vm_name).await?;
            Outcome::Displayed(DisplayPayload::found(ip, vm_name))
        }
        Command::IsActive { vm_name } => Outcome::Active(reconciler.check_active(vm_name).await?),
        Command::Allocate => Outcome::Allocated(reconciler.allocate().await?),
        Command::Deallocate => Outcome::Deallocated(reconciler.deallocate().await?),
    };

    info!("{} completed", command.action());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_payload_shape() {
        let payload = DisplayPayload::found("10.0.0.5".to_string(), "web1");
        assert_eq!(
            payload.render(),
            r#"{ "rc": 0, "ip": "10.0.0.5", "msg": "OPSTX7832I: Found floating IP 10.0.0.5 for VM web1" }"#
        );

        let parsed: serde_json::Value = serde_json::from_str(&payload.render()).unwrap();
        assert_eq!(parsed["rc"], 0);
        assert_eq!(parsed["ip"], "10.0.0.5");
    }

    #[test]
    fn test_display_payload_escapes_instance_name() {
        let payload = DisplayPayload::found("10.0.0.5".to_string(), "we\"b1");
        let parsed: serde_json::Value = serde_json::from_str(&payload.render()).unwrap();
        assert_eq!(
            parsed["msg"],
            "OPSTX7832I: Found floating IP 10.0.0.5 for VM we\"b1"
        );
    }

    #[test]
    fn test_only_plain_deassociate_resolves_locally() {
        let plain = Command::Deassociate { vm_name: "web1".to_string(), release: false };
        assert_eq!(resolve_locally(&plain), Some(Outcome::Deassociated));

        let legacy = Command::Deassociate { vm_name: "web1".to_string(), release: true };
        assert!(resolve_locally(&legacy).is_none());
        assert!(resolve_locally(&Command::IsActive { vm_name: "web1".to_string() }).is_none());
    }

    #[test]
    fn test_only_display_prints() {
        assert!(Outcome::Deassociated.stdout().is_none());
        assert_eq!(Outcome::Deassociated.exit_code(), exit_code::SUCCESS);
    }
}
