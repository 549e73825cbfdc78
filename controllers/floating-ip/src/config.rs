//! Command line and environment configuration
//!
//! Every value can come from a flag or from its environment variable. The
//! result is turned into `Credentials` plus `Settings` once in `main` and
//! handed to each component explicitly.

use crate::error::ControllerError;
use clap::error::ErrorKind;
pub use clap::Parser;
use clap::Subcommand;
use nova_client::Credentials;
use std::time::Duration;

/// Pool that new addresses are allocated from
pub const DEFAULT_POOL_NAME: &str = "vlan_690_network";
/// Default log directive. Can use this argument or FLOATING_IP_LOG env var
pub const DEFAULT_LOG: &str = "info";
/// log as "json" or "standard" (unstructured)
pub const DEFAULT_LOG_FORMAT: &str = "standard";
/// Environment variables that must carry the Keystone credentials
pub const CREDENTIAL_VARS: [&str; 5] = [
    "OS_AUTH_URL",
    "OS_TENANT_ID",
    "OS_TENANT_NAME",
    "OS_USERNAME",
    "OS_PASSWORD",
];

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[clap(author, name = "floating-ip", bin_name = "floating-ip", version, about, long_about = None)]
/// Associates floating IP addresses with compute instances
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
    /// Keystone endpoint
    #[clap(long, env = "OS_AUTH_URL", global = true)]
    pub auth_url: Option<String>,
    /// Tenant (project) id
    #[clap(long, env = "OS_TENANT_ID", global = true)]
    pub tenant_id: Option<String>,
    /// Tenant (project) name
    #[clap(long, env = "OS_TENANT_NAME", global = true)]
    pub tenant_name: Option<String>,
    /// Keystone user name
    #[clap(long, env = "OS_USERNAME", global = true)]
    pub username: Option<String>,
    /// Keystone password
    #[clap(long, env = "OS_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
    /// Pool to allocate new floating IPs from
    #[clap(long, env = "OS_IP_POOL_NAME", global = true, default_value = DEFAULT_POOL_NAME)]
    pub pool: String,
    /// set the log level. All valid RUST_LOG arguments are accepted
    #[clap(long, env = "FLOATING_IP_LOG", global = true, default_value = DEFAULT_LOG)]
    pub log: String,
    /// log format
    #[clap(
        long,
        env = "FLOATING_IP_LOG_FORMAT",
        global = true,
        default_value = DEFAULT_LOG_FORMAT,
        value_parser = ["standard", "json"]
    )]
    pub log_format: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bind a floating IP to the instance and confirm it took effect
    #[clap(name = "associate")]
    Associate { vm_name: String },
    /// Report success; with --release, unbind the address and release idle pool addresses
    #[clap(name = "deassociate")]
    Deassociate {
        vm_name: String,
        #[clap(long)]
        release: bool,
    },
    /// Print the instance's floating IP as a one-line JSON payload
    #[clap(name = "displayassociated")]
    DisplayAssociated { vm_name: String },
    /// Exit 0 if the instance is ACTIVE
    #[clap(name = "isactive")]
    IsActive { vm_name: String },
    /// Allocate one floating IP into the pool (debug)
    #[clap(name = "allocate", hide = true)]
    Allocate,
    /// Release every unassigned floating IP (debug)
    #[clap(name = "deallocate", hide = true)]
    Deallocate,
}

impl Command {
    /// Short name used in logs
    pub fn action(&self) -> &'static str {
        match self {
            Self::Associate { .. } => "associate",
            Self::Deassociate { .. } => "deassociate",
            Self::DisplayAssociated { .. } => "displayassociated",
            Self::IsActive { .. } => "isactive",
            Self::Allocate => "allocate",
            Self::Deallocate => "deallocate",
        }
    }
}

impl Cli {
    /// Collect the Keystone credentials, naming every missing variable at once
    pub fn credentials(&self) -> Result<Credentials, ControllerError> {
        let values = [
            &self.auth_url,
            &self.tenant_id,
            &self.tenant_name,
            &self.username,
            &self.password,
        ];
        require_credentials(CREDENTIAL_VARS.iter().copied().zip(values.map(Option::as_deref)))?;

        Ok(Credentials {
            auth_url: self.auth_url.clone().unwrap_or_default(),
            tenant_id: self.tenant_id.clone().unwrap_or_default(),
            tenant_name: self.tenant_name.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
        })
    }

    /// Reconciliation settings for this invocation
    pub fn settings(&self) -> Settings {
        Settings {
            pool_name: self.pool.clone(),
            timings: Timings::default(),
        }
    }
}

/// Fail with every credential variable that is unset or empty
fn require_credentials<'a>(
    fields: impl IntoIterator<Item = (&'static str, Option<&'a str>)>,
) -> Result<(), ControllerError> {
    let missing: Vec<&str> = fields
        .into_iter()
        .filter(|(_, value)| value.is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ControllerError::MissingConfig(format!(
        "please set all environment variables: {}",
        missing.join(", ")
    )))
}

/// Error reported when the command line does not parse
///
/// Missing credentials in the environment take precedence over argument
/// errors, so a bare invocation without `OS_*` variables reports 100.
pub fn startup_error(err: &clap::Error, env: impl Fn(&str) -> Option<String>) -> ControllerError {
    let values: Vec<(&'static str, Option<String>)> =
        CREDENTIAL_VARS.iter().map(|name| (*name, env(name))).collect();
    match require_credentials(values.iter().map(|(name, value)| (*name, value.as_deref()))) {
        Err(missing) => missing,
        Ok(()) => classify_parse_error(err),
    }
}

/// Map a clap parse failure onto the exit code taxonomy
pub fn classify_parse_error(err: &clap::Error) -> ControllerError {
    let rendered = err.to_string();
    let message = rendered.lines().next().unwrap_or_default().trim_start_matches("error: ").to_string();
    match err.kind() {
        ErrorKind::InvalidSubcommand => ControllerError::UnrecognizedAction(message),
        _ => ControllerError::IncorrectArgs(message),
    }
}

/// Everything the reconciler needs besides the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub pool_name: String,
    pub timings: Timings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pool_name: DEFAULT_POOL_NAME.to_string(),
            timings: Timings::default(),
        }
    }
}

/// Attempt budgets and intervals for every loop in the reconciler
///
/// Defaults bound the lifecycle wait at 100 x 3s (5 minutes) and the whole
/// associate flow at 7 outer attempts, each with a 2s settle and up to 7
/// confirmation queries 3s apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// Lifecycle polls before giving up on a terminal status
    pub lifecycle_attempts: u32,
    pub lifecycle_interval: Duration,
    /// Clean confirmation queries per bind
    pub confirm_attempts: u32,
    /// Failed confirmation queries tolerated per bind
    pub confirm_max_errors: u32,
    pub confirm_interval: Duration,
    /// Wait between the bind request and the first confirmation query
    pub settle: Duration,
    /// Outer select-bind-confirm attempts
    pub bind_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_step: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            lifecycle_attempts: 100,
            lifecycle_interval: Duration::from_secs(3),
            confirm_attempts: 7,
            confirm_max_errors: 3,
            confirm_interval: Duration::from_secs(3),
            settle: Duration::from_secs(2),
            bind_attempts: 7,
            backoff_base: Duration::from_secs(1),
            backoff_step: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDS: [&str; 10] = [
        "--auth-url", "http://keystone:5000/v2.0",
        "--tenant-id", "t1",
        "--tenant-name", "demo",
        "--username", "alice",
        "--password", "hunter2",
    ];

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["floating-ip"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    #[test]
    fn test_parse_associate_with_flags() {
        let mut args = vec!["associate", "web1"];
        args.extend_from_slice(&CREDS);
        let cli = parse(&args).unwrap();

        assert_eq!(cli.command, Command::Associate { vm_name: "web1".to_string() });
        assert_eq!(cli.pool, DEFAULT_POOL_NAME);
        let creds = cli.credentials().unwrap();
        assert_eq!(creds.tenant_name, "demo");
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn test_parse_deassociate_release_flag() {
        let cli = parse(&["deassociate", "web1", "--release"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Deassociate { vm_name: "web1".to_string(), release: true }
        );
    }

    #[test]
    fn test_displayassociated_command_name() {
        let cli = parse(&["displayassociated", "web1"]).unwrap();
        assert_eq!(cli.command.action(), "displayassociated");
    }

    #[test]
    fn test_missing_instance_name_is_incorrect_args() {
        let err = parse(&["associate"]).unwrap_err();
        assert_eq!(classify_parse_error(&err).exit_code(), crate::error::exit_code::INCORRECT_ARGS);
    }

    #[test]
    fn test_unknown_command_is_unrecognized_action() {
        let err = parse(&["frobnicate", "web1"]).unwrap_err();
        assert_eq!(
            classify_parse_error(&err).exit_code(),
            crate::error::exit_code::UNRECOGNIZED_ACTION
        );
    }

    fn full_env(name: &str) -> Option<String> {
        Some(format!("value-of-{}", name))
    }

    #[test]
    fn test_missing_environment_wins_over_bad_arguments() {
        let err = parse(&["associate"]).unwrap_err();

        let startup = startup_error(&err, |_| None);
        assert_eq!(startup.exit_code(), crate::error::exit_code::MISSING_CONFIG);

        let partial = startup_error(&err, |name| (name != "OS_PASSWORD").then(|| full_env(name)).flatten());
        match partial {
            ControllerError::MissingConfig(msg) => assert_eq!(msg, "please set all environment variables: OS_PASSWORD"),
            other => panic!("expected missing config, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_arguments_with_full_environment_keep_their_code() {
        let err = parse(&["associate"]).unwrap_err();
        assert_eq!(
            startup_error(&err, full_env).exit_code(),
            crate::error::exit_code::INCORRECT_ARGS
        );

        let err = parse(&["frobnicate", "web1"]).unwrap_err();
        assert_eq!(
            startup_error(&err, full_env).exit_code(),
            crate::error::exit_code::UNRECOGNIZED_ACTION
        );
    }

    #[test]
    fn test_empty_credentials_are_missing() {
        let cli = parse(&["isactive", "web1", "--auth-url", "", "--username", "alice"]).unwrap();
        match cli.credentials() {
            Err(ControllerError::MissingConfig(msg)) => {
                assert!(msg.contains("OS_AUTH_URL"));
                assert!(!msg.contains("OS_USERNAME"));
            }
            other => panic!("expected missing config, got {:?}", other),
        }
    }

    #[test]
    fn test_default_timings_bound_lifecycle_wait() {
        let timings = Timings::default();
        assert_eq!(timings.lifecycle_interval * timings.lifecycle_attempts, Duration::from_secs(300));
    }
}
