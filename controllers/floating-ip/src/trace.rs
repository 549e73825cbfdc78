//! tracing configuration
//!
//! Logs go to stderr so stdout only ever carries the `displayassociated` payload.

use anyhow::Result;
use tracing_subscriber::{
    filter::EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Install the global subscriber
///
/// # Arguments
/// * `directive` - EnvFilter directive, falls back to "info" when it does not parse
/// * `format` - "json" or "standard"
pub fn init(directive: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_new("info"))?
        .add_directive("hyper=off".parse()?)
        .add_directive("reqwest=warn".parse()?);

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
