//! Controller-specific error types.
//!
//! Every failure the reconciler can report is a `ControllerError` variant, and
//! every variant maps to exactly one process exit code. Nothing below `main`
//! terminates the process.

use nova_client::{NovaError, ServerStatus};
use thiserror::Error;

/// Process exit codes. Zero is success; failures are flat codes starting at 100.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const MISSING_CONFIG: u8 = 100;
    pub const INCORRECT_ARGS: u8 = 101;
    pub const UNRECOGNIZED_ACTION: u8 = 102;
    pub const CONTROL_PLANE_EXCEPTION: u8 = 103;
    pub const INSTANCE_NOT_FOUND: u8 = 104;
    pub const ADDRESS_NOT_AVAILABLE: u8 = 105;
    pub const ADDRESS_NOT_ASSOCIATED: u8 = 106;
    pub const ADDRESS_ALREADY_ASSOCIATED: u8 = 107;
    pub const INSTANCE_NOT_ACTIVE: u8 = 108;
    pub const INSTANCE_IN_ERROR: u8 = 109;
}

/// Errors that can occur in the floating IP controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Required configuration (credentials) is missing
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Wrong number or shape of arguments
    #[error("Incorrect arguments: {0}")]
    IncorrectArgs(String),

    /// Command not recognized
    #[error("Unrecognized action: {0}")]
    UnrecognizedAction(String),

    /// Compute API error that escaped a bounded retry loop
    #[error("Compute error: {0}")]
    Compute(#[from] NovaError),

    /// Instance lookup returned nothing
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// Pool had no unassigned address, even after an allocation attempt
    #[error("No floating IP available for instance {0}")]
    AddressNotAvailable(String),

    /// Instance has no floating IP bound
    #[error("No floating IP is associated with instance {0}")]
    NotAssociated(String),

    /// Instance already has a floating IP bound
    #[error("Instance {instance} already has floating IP {address}")]
    AlreadyAssociated { instance: String, address: String },

    /// Instance exists but is not ACTIVE
    #[error("Instance {instance} is not active (status {status})")]
    InstanceNotActive { instance: String, status: ServerStatus },

    /// Instance is in ERROR state
    #[error("Instance {0} is in error state")]
    InstanceInError(String),

    /// Bind attempts exhausted without a confirmed association
    #[error("Association for instance {instance} not confirmed after {attempts} attempts")]
    AssociationNotConfirmed { instance: String, attempts: u32 },
}

impl ControllerError {
    /// Exit code reported for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingConfig(_) => exit_code::MISSING_CONFIG,
            Self::IncorrectArgs(_) => exit_code::INCORRECT_ARGS,
            Self::UnrecognizedAction(_) => exit_code::UNRECOGNIZED_ACTION,
            Self::Compute(_) => exit_code::CONTROL_PLANE_EXCEPTION,
            Self::InstanceNotFound(_) => exit_code::INSTANCE_NOT_FOUND,
            Self::AddressNotAvailable(_) => exit_code::ADDRESS_NOT_AVAILABLE,
            Self::NotAssociated(_) | Self::AssociationNotConfirmed { .. } => {
                exit_code::ADDRESS_NOT_ASSOCIATED
            }
            Self::AlreadyAssociated { .. } => exit_code::ADDRESS_ALREADY_ASSOCIATED,
            Self::InstanceNotActive { .. } => exit_code::INSTANCE_NOT_ACTIVE,
            Self::InstanceInError(_) => exit_code::INSTANCE_IN_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_signal() {
        let errors = [
            ControllerError::MissingConfig("OS_AUTH_URL".to_string()),
            ControllerError::IncorrectArgs("missing instance name".to_string()),
            ControllerError::UnrecognizedAction("frobnicate".to_string()),
            ControllerError::Compute(NovaError::Api("boom".to_string())),
            ControllerError::InstanceNotFound("web1".to_string()),
            ControllerError::AddressNotAvailable("web1".to_string()),
            ControllerError::NotAssociated("web1".to_string()),
            ControllerError::AlreadyAssociated {
                instance: "web2".to_string(),
                address: "10.0.0.9".to_string(),
            },
            ControllerError::InstanceNotActive {
                instance: "web1".to_string(),
                status: ServerStatus::Build,
            },
            ControllerError::InstanceInError("web1".to_string()),
        ];
        let codes: Vec<u8> = errors.iter().map(ControllerError::exit_code).collect();
        assert_eq!(codes, (100..=109).collect::<Vec<u8>>());
    }

    #[test]
    fn test_unconfirmed_association_reports_not_associated() {
        let err = ControllerError::AssociationNotConfirmed {
            instance: "web1".to_string(),
            attempts: 7,
        };
        assert_eq!(err.exit_code(), exit_code::ADDRESS_NOT_ASSOCIATED);
    }
}
