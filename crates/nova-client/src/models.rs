//! Compute API models
//!
//! These models match the Nova v2 (`v1_1`) JSON bodies for servers and the
//! `os-floating-ips` extension, plus the Keystone v2 token exchange.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Credentials used to obtain a token from Keystone
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Keystone endpoint, e.g. "http://keystone:5000/v2.0"
    pub auth_url: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_url", &self.auth_url)
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("username", &self.username)
            .field("password", &"XXXXXXXXXX")
            .finish()
    }
}

/// Server (instance) model from `GET /servers/detail` and `GET /servers/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub updated: Option<String>, // ISO 8601 datetime
}

impl Server {
    /// Whether the server has settled into a state that will not change on its own
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Server lifecycle status
///
/// Nova reports many transitional states (REBOOT, RESIZE, MIGRATING, ...).
/// Only BUILD, ACTIVE and ERROR matter here; everything else is transitional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerStatus {
    Build,
    Active,
    Error,
    #[serde(other)]
    Transitional,
}

impl ServerStatus {
    /// ACTIVE and ERROR end the lifecycle poll
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Active | Self::Error)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Build => "build",
            Self::Active => "active",
            Self::Error => "error",
            Self::Transitional => "transitional",
        };
        f.write_str(s)
    }
}

/// Floating IP model from the `os-floating-ips` extension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FloatingIp {
    /// nova-network reports integer ids, neutron-backed deployments report UUIDs
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub ip: String,
    #[serde(default)]
    pub pool: String,
    /// Owning server id; `None` means the address is available
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub fixed_ip: Option<String>,
}

impl FloatingIp {
    /// Not bound to any server
    pub fn is_available(&self) -> bool {
        self.instance_id.is_none()
    }

    /// Bound to the given server
    pub fn is_assigned_to(&self, server_id: &str) -> bool {
        self.instance_id.as_deref() == Some(server_id)
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

// Response envelopes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerList {
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub server: Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpList {
    pub floating_ips: Vec<FloatingIp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpEnvelope {
    pub floating_ip: FloatingIp,
}

/// Body for `POST /servers/{id}/action`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ServerAction {
    AddFloatingIp { address: String },
    RemoveFloatingIp { address: String },
}

/// Body for `POST /os-floating-ips`
#[derive(Debug, Clone, Serialize)]
pub struct AllocateFloatingIpRequest {
    pub pool: String,
}

// Keystone v2 token exchange

#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    pub auth: TokenRequestAuth,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestAuth {
    pub tenant_name: String,
    pub password_credentials: PasswordCredentials,
}

#[derive(Clone, Serialize)]
pub struct PasswordCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: Access,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub token: Token,
    #[serde(default)]
    pub service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(default)]
    pub expires: Option<String>, // ISO 8601 datetime
    #[serde(default)]
    pub tenant: Option<TokenTenant>,
}

impl Token {
    /// Parsed expiry, if Keystone sent one in RFC 3339 form
    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.expires
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenTenant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(rename = "publicURL")]
    pub public_url: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_status_unknown_is_transitional() {
        let server: Server = serde_json::from_str(
            r#"{"id": "abc", "name": "web1", "status": "RESIZE", "tenant_id": "t1"}"#,
        )
        .unwrap();
        assert_eq!(server.status, ServerStatus::Transitional);
        assert!(!server.is_terminal());
    }

    #[test]
    fn test_server_status_terminal_values() {
        for (raw, expected) in [("ACTIVE", ServerStatus::Active), ("ERROR", ServerStatus::Error)] {
            let server: Server = serde_json::from_value(serde_json::json!({
                "id": "abc",
                "name": "web1",
                "status": raw,
            }))
            .unwrap();
            assert_eq!(server.status, expected);
            assert!(server.is_terminal());
        }
        let building: Server = serde_json::from_value(serde_json::json!({
            "id": "abc", "name": "web1", "status": "BUILD"
        }))
        .unwrap();
        assert_eq!(building.status, ServerStatus::Build);
    }

    #[test]
    fn test_floating_ip_accepts_numeric_and_uuid_ids() {
        let list: FloatingIpList = serde_json::from_str(
            r#"{"floating_ips": [
                {"id": 7, "ip": "10.0.0.5", "pool": "public", "instance_id": null, "fixed_ip": null},
                {"id": "5f0c9b1e-1111-2222-3333-444455556666", "ip": "10.0.0.9", "pool": "public",
                 "instance_id": "srv-2", "fixed_ip": "192.168.0.4"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(list.floating_ips[0].id, "7");
        assert!(list.floating_ips[0].is_available());
        assert!(list.floating_ips[1].is_assigned_to("srv-2"));
        assert!(!list.floating_ips[1].is_assigned_to("srv-3"));
    }

    #[test]
    fn test_server_action_wire_format() {
        let body = serde_json::to_value(ServerAction::AddFloatingIp {
            address: "10.0.0.5".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"addFloatingIp": {"address": "10.0.0.5"}}));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            auth_url: "http://keystone:5000/v2.0".to_string(),
            tenant_id: "t1".to_string(),
            tenant_name: "demo".to_string(),
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_token_expiry_parses_rfc3339() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access": {
                "token": {"id": "tok", "expires": "2013-11-07T12:00:00Z", "tenant": {"id": "t1", "name": "demo"}},
                "serviceCatalog": [{"type": "compute", "name": "nova",
                    "endpoints": [{"publicURL": "http://nova:8774/v2/t1", "region": "RegionOne"}]}]
            }}"#,
        )
        .unwrap();
        assert!(response.access.token.expires_at().is_some());
        assert_eq!(response.access.service_catalog[0].endpoints[0].public_url, "http://nova:8774/v2/t1");
    }
}
