//! Floating IP Controller
//!
//! One-shot reconciler that associates a floating IP with an OpenStack
//! compute instance and confirms the association took effect.
//!
//! Each invocation runs one command against the compute API and reports the
//! result as a process exit code; `displayassociated` also prints a one-line
//! JSON payload on stdout.

mod backoff;
mod config;
mod controller;
mod error;
mod janitor;
mod poller;
mod pool;
mod reconciler;
mod retry;
mod trace;

#[cfg(test)]
mod test_utils;

use crate::config::{startup_error, Cli, Parser};
use crate::controller::Outcome;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use clap::error::ErrorKind;
use nova_client::ComputeClient;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                // clap writes help to stdout
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            let err = startup_error(&e, |name| std::env::var(name).ok());
            match err {
                ControllerError::MissingConfig(_) => eprintln!("{err}"),
                _ => {
                    let _ = e.print();
                }
            }
            return ExitCode::from(err.exit_code());
        }
    };

    if let Err(e) = trace::init(&cli.log, &cli.log_format) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let action = cli.command.action();
    let code = match run(cli).await {
        Ok(outcome) => {
            if let Some(payload) = outcome.stdout() {
                println!("{payload}");
            }
            outcome.exit_code()
        }
        Err(e) => {
            error!("{} failed: {}", action, e);
            e.exit_code()
        }
    };

    info!("{} exiting with code {}", action, code);
    ExitCode::from(code)
}

async fn run(cli: Cli) -> Result<Outcome, ControllerError> {
    let credentials = cli.credentials()?;
    let settings = cli.settings();

    info!("Starting Floating IP Controller: {}", cli.command.action());
    info!("Configuration:");
    info!("  Auth URL: {}", credentials.auth_url);
    info!("  Tenant: {} ({})", credentials.tenant_name, credentials.tenant_id);
    info!("  Username: {}", credentials.username);
    info!("  Password: ********");
    info!("  Pool: {}", settings.pool_name);

    if let Some(outcome) = controller::resolve_locally(&cli.command) {
        return Ok(outcome);
    }

    let client = ComputeClient::authenticate(&credentials).await?;

    let mut reconciler = Reconciler::new(Box::new(client), settings);
    controller::dispatch(&mut reconciler, &cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exit_code;

    /// Keystone address that refuses connections
    const UNREACHABLE_AUTH_URL: &str = "http://127.0.0.1:1/v2.0";

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["floating-ip"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&[
            "--auth-url", UNREACHABLE_AUTH_URL,
            "--tenant-id", "t1",
            "--tenant-name", "demo",
            "--username", "alice",
        ]);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_deassociate_succeeds_without_reaching_keystone() {
        let outcome = run(cli(&["deassociate", "web1", "--password", "hunter2"])).await.unwrap();

        assert_eq!(outcome, Outcome::Deassociated);
        assert_eq!(outcome.exit_code(), exit_code::SUCCESS);
    }

    #[tokio::test]
    async fn test_deassociate_still_requires_credentials() {
        let err = run(cli(&["deassociate", "web1", "--password", ""])).await.unwrap_err();

        assert_eq!(err.exit_code(), exit_code::MISSING_CONFIG);
    }

    #[tokio::test]
    async fn test_other_commands_report_unreachable_keystone() {
        let err = run(cli(&["isactive", "web1", "--password", "hunter2"])).await.unwrap_err();

        assert_eq!(err.exit_code(), exit_code::CONTROL_PLANE_EXCEPTION);
    }
}
