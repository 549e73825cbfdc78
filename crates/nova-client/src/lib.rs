//! Nova REST API Client
//!
//! A Rust client library for the parts of the OpenStack compute API needed to
//! manage floating IP addresses: server lookup, the floating IP pool, and the
//! add/remove floating IP server actions.
//!
//! # Example
//!
//! ```no_run
//! use nova_client::{ComputeClient, Credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials {
//!     auth_url: "http://keystone:5000/v2.0".to_string(),
//!     tenant_id: "0a1b2c".to_string(),
//!     tenant_name: "demo".to_string(),
//!     username: "demo".to_string(),
//!     password: "secret".to_string(),
//! };
//!
//! // Authenticate against Keystone and resolve the compute endpoint
//! let client = ComputeClient::authenticate(&credentials).await?;
//!
//! // Look up a server by name
//! let server = client.find_server("web1").await?;
//!
//! // List the floating IP pool
//! let floating_ips = client.list_floating_ips().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Keystone v2 authentication**: token plus compute endpoint from the service catalog
//! - **Servers**: lookup by exact name (falling back to id) and by id
//! - **Floating IPs**: list, allocate from a pool, release, add to / remove from a server
//! - **Mocking**: `MockComputeClient` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod compute_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::ComputeClient;
pub use compute_trait::ComputeClientTrait;
pub use error::NovaError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockComputeClient;
