//! Compute API client
//!
//! Implements the subset of the Nova REST API used for floating IP management.
//! Based on the Nova API structure: /servers, /servers/{id}/action and /os-floating-ips

use crate::compute_trait::ComputeClientTrait;
use crate::error::NovaError;
use crate::models::*;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Service catalog type of the compute endpoint
const COMPUTE_SERVICE_TYPE: &str = "compute";

/// Compute API client
pub struct ComputeClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for ComputeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ComputeClient {
    /// Create a client from an already issued token
    ///
    /// # Arguments
    /// * `endpoint` - Compute endpoint including the tenant path (e.g., "http://nova:8774/v2/<tenant>")
    /// * `token` - Keystone token
    pub fn new(endpoint: String, token: String) -> Result<Self, NovaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(NovaError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Authenticate against Keystone v2 and resolve the compute endpoint
    ///
    /// Posts password credentials to `{auth_url}/tokens` and picks the first
    /// `compute` entry of the returned service catalog.
    ///
    /// # Returns
    /// * `Ok(ComputeClient)` - Client bound to the tenant's compute endpoint
    /// * `Err(NovaError)` - Credentials rejected, Keystone unreachable, or no compute endpoint
    pub async fn authenticate(credentials: &Credentials) -> Result<Self, NovaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(NovaError::Http)?;

        let url = format!("{}/tokens", credentials.auth_url.trim_end_matches('/'));
        debug!("Requesting token from {} for user {}", url, credentials.username);

        let body = TokenRequest {
            auth: TokenRequestAuth {
                tenant_name: credentials.tenant_name.clone(),
                password_credentials: PasswordCredentials {
                    username: credentials.username.clone(),
                    password: credentials.password.clone(),
                },
            },
        };

        let response = client
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(NovaError::Authentication(format!(
                "Keystone rejected credentials: {} - {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NovaError::Authentication(format!(
                "Token request failed: {} - {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&response_text)?;
        let access = token.access;

        if let Some(tenant) = &access.token.tenant {
            if tenant.id != credentials.tenant_id {
                warn!(
                    "Token scoped to tenant {} but configured tenant id is {}",
                    tenant.id, credentials.tenant_id
                );
            }
        }

        let endpoint = access
            .service_catalog
            .iter()
            .find(|entry| entry.service_type == COMPUTE_SERVICE_TYPE)
            .and_then(|entry| entry.endpoints.first())
            .map(|endpoint| endpoint.public_url.clone())
            .ok_or_else(|| {
                NovaError::Authentication("No compute endpoint in service catalog".to_string())
            })?;

        match access.token.expires_at() {
            Some(expires) => info!("Authenticated; compute endpoint {} (token expires {})", endpoint, expires),
            None => info!("Authenticated; compute endpoint {}", endpoint),
        }

        Self::new(endpoint, access.token.id)
    }

    /// Get the compute endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Map a non-success response to an error, keeping the body for context
    async fn check(response: Response, what: &str) -> Result<Response, NovaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => NovaError::NotFound(format!("{}: {}", what, body)),
            StatusCode::CONFLICT => NovaError::Conflict(format!("{}: {}", what, body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                NovaError::Authentication(format!("{}: {} - {}", what, status, body))
            }
            _ => NovaError::Api(format!("{} failed: {} - {}", what, status, body)),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, NovaError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = Self::check(response, what).await?;
        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            NovaError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value, what: &str) -> Result<Response, NovaError> {
        let url = self.url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self.client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::check(response, what).await
    }

    /// Find a server by exact name, falling back to a lookup by id
    ///
    /// The `name` filter of `/servers/detail` is a regular expression on the
    /// server side, so results are filtered again for an exact match.
    ///
    /// # Returns
    /// * `Ok(Some(Server))` - The single matching server
    /// * `Ok(None)` - No server with that name or id
    /// * `Err(NovaError::InvalidRequest)` - More than one server has that name
    pub async fn find_server(&self, name_or_id: &str) -> Result<Option<Server>, NovaError> {
        debug!("Looking up server {}", name_or_id);

        let path = format!("/servers/detail?name={}", urlencoding::encode(name_or_id));
        let list: ServerList = self.get_json(&path, "List servers").await?;
        let mut matches: Vec<Server> = list
            .servers
            .into_iter()
            .filter(|s| s.name == name_or_id)
            .collect();

        match matches.len() {
            1 => return Ok(matches.pop()),
            0 => {}
            n => {
                return Err(NovaError::InvalidRequest(format!(
                    "{} servers are named {}",
                    n, name_or_id
                )));
            }
        }

        match self.get_server(name_or_id).await {
            Ok(server) => Ok(Some(server)),
            Err(NovaError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a server by id
    ///
    /// # Returns
    /// * `Ok(Server)` - The server
    /// * `Err(NovaError::NotFound)` - No server with that id
    pub async fn get_server(&self, id: &str) -> Result<Server, NovaError> {
        let path = format!("/servers/{}", urlencoding::encode(id));
        let envelope: ServerEnvelope = self.get_json(&path, &format!("Get server {}", id)).await?;
        Ok(envelope.server)
    }

    /// List every floating IP visible to the tenant
    pub async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NovaError> {
        let list: FloatingIpList = self.get_json("/os-floating-ips", "List floating IPs").await?;
        debug!("Listed {} floating IPs", list.floating_ips.len());
        Ok(list.floating_ips)
    }

    /// Allocate one floating IP from the named pool
    ///
    /// # Arguments
    /// * `pool` - Pool name (external network name)
    ///
    /// # Returns
    /// * `Ok(FloatingIp)` - The new, unassigned address
    /// * `Err(NovaError)` - Pool exhausted, quota exceeded, or request failed
    pub async fn allocate_floating_ip(&self, pool: &str) -> Result<FloatingIp, NovaError> {
        debug!("Allocating floating IP from pool {}", pool);
        let body = serde_json::to_value(AllocateFloatingIpRequest { pool: pool.to_string() })?;
        let response = self
            .post_json("/os-floating-ips", &body, &format!("Allocate floating IP from pool {}", pool))
            .await?;

        let envelope: FloatingIpEnvelope = response.json().await?;
        Ok(envelope.floating_ip)
    }

    /// Release (deallocate) a floating IP back to its pool
    pub async fn release_floating_ip(&self, id: &str) -> Result<(), NovaError> {
        let url = self.url(&format!("/os-floating-ips/{}", urlencoding::encode(id)));
        debug!("DELETE {}", url);

        let response = self.client
            .delete(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::check(response, &format!("Release floating IP {}", id)).await?;
        Ok(())
    }

    async fn server_action(&self, server_id: &str, action: ServerAction) -> Result<(), NovaError> {
        let body = serde_json::to_value(&action)?;
        let path = format!("/servers/{}/action", urlencoding::encode(server_id));
        self.post_json(&path, &body, &format!("Server {} action", server_id)).await?;
        Ok(())
    }

    /// Bind a floating IP to a server
    ///
    /// The call returns as soon as the request is accepted; the binding may not
    /// be visible in `list_floating_ips` until later.
    pub async fn add_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError> {
        debug!("Adding floating IP {} to server {}", address, server_id);
        self.server_action(server_id, ServerAction::AddFloatingIp { address: address.to_string() }).await
    }

    /// Unbind a floating IP from a server
    pub async fn remove_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError> {
        debug!("Removing floating IP {} from server {}", address, server_id);
        self.server_action(server_id, ServerAction::RemoveFloatingIp { address: address.to_string() }).await
    }
}

// Delegates all trait methods to the inherent implementations
#[async_trait::async_trait]
impl ComputeClientTrait for ComputeClient {
    async fn find_server(&self, name_or_id: &str) -> Result<Option<Server>, NovaError> {
        self.find_server(name_or_id).await
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NovaError> {
        self.list_floating_ips().await
    }

    async fn allocate_floating_ip(&self, pool: &str) -> Result<FloatingIp, NovaError> {
        self.allocate_floating_ip(pool).await
    }

    async fn release_floating_ip(&self, id: &str) -> Result<(), NovaError> {
        self.release_floating_ip(id).await
    }

    async fn add_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError> {
        self.add_floating_ip(server_id, address).await
    }

    async fn remove_floating_ip(&self, server_id: &str, address: &str) -> Result<(), NovaError> {
        self.remove_floating_ip(server_id, address).await
    }
}
