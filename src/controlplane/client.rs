//! Control Plane REST API Client
//!
//! HTTP client for the coordination server's admin API. Every call carries
//! the API key as a bearer token and maps transport failures into a small
//! error enum the console layers can render.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Node, User};

/// Control plane REST API client
pub struct ControlPlaneClient {
    client: Client,
    config: ControlPlaneConfig,
}

/// Configuration for the control plane client
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Base URL of the control plane (e.g., "http://localhost:8080")
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: String::new(),
            request_timeout_ms: 5000,
        }
    }
}

impl ControlPlaneClient {
    /// Create a new client with the given configuration
    pub fn new(config: ControlPlaneConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if the control plane is reachable
    pub async fn health_check(&self) -> Result<(), ControlPlaneError> {
        self.list_users().await?;
        Ok(())
    }

    /// List all nodes registered with the control plane
    pub async fn list_nodes(&self) -> Result<Vec<Node>, ControlPlaneError> {
        let resp: NodesResponse = self.get(&self.url("/node")).await?;
        Ok(resp.nodes)
    }

    /// Fetch one node by id
    pub async fn get_node(&self, id: u64) -> Result<Node, ControlPlaneError> {
        let resp: NodeResponse = self.get(&self.url(&format!("/node/{id}"))).await?;
        Ok(resp.node)
    }

    /// Rename a node
    pub async fn rename_node(&self, id: u64, new_name: &str) -> Result<Node, ControlPlaneError> {
        let resp: NodeResponse = self
            .post(&self.url(&format!("/node/{id}/rename/{new_name}")), &Empty {})
            .await?;
        Ok(resp.node)
    }

    /// Reassign a node to another user
    pub async fn move_node(&self, id: u64, user: &str) -> Result<Node, ControlPlaneError> {
        let body = MoveNodeRequest {
            user: user.to_string(),
        };
        let resp: NodeResponse = self.post(&self.url(&format!("/node/{id}/user")), &body).await?;
        Ok(resp.node)
    }

    /// Replace the full tag set of a node
    pub async fn set_tags(&self, id: u64, tags: &[String]) -> Result<Node, ControlPlaneError> {
        let body = SetTagsRequest {
            tags: tags.to_vec(),
        };
        let resp: NodeResponse = self.post(&self.url(&format!("/node/{id}/tags")), &body).await?;
        Ok(resp.node)
    }

    /// Remove a node from the fleet
    pub async fn delete_node(&self, id: u64) -> Result<(), ControlPlaneError> {
        self.delete(&self.url(&format!("/node/{id}"))).await
    }

    /// Expire a node's key, forcing reauthentication
    pub async fn expire_node(&self, id: u64) -> Result<Node, ControlPlaneError> {
        let resp: NodeResponse = self
            .post(&self.url(&format!("/node/{id}/expire")), &Empty {})
            .await?;
        Ok(resp.node)
    }

    /// Replace the full approved-route set of a node
    pub async fn set_approved_routes(
        &self,
        id: u64,
        routes: &[String],
    ) -> Result<Node, ControlPlaneError> {
        let body = ApproveRoutesRequest {
            routes: routes.to_vec(),
        };
        let resp: NodeResponse = self
            .post(&self.url(&format!("/node/{id}/approve_routes")), &body)
            .await?;
        Ok(resp.node)
    }

    /// List all users
    pub async fn list_users(&self) -> Result<Vec<User>, ControlPlaneError> {
        let resp: UsersResponse = self.get(&self.url("/user")).await?;
        Ok(resp.users)
    }

    /// Create a user
    pub async fn create_user(&self, name: &str) -> Result<User, ControlPlaneError> {
        let body = CreateUserRequest {
            name: name.to_string(),
        };
        let resp: UserResponse = self.post(&self.url("/user"), &body).await?;
        Ok(resp.user)
    }

    /// Rename a user
    pub async fn rename_user(&self, id: u64, new_name: &str) -> Result<User, ControlPlaneError> {
        let resp: UserResponse = self
            .post(&self.url(&format!("/user/{id}/rename/{new_name}")), &Empty {})
            .await?;
        Ok(resp.user)
    }

    /// Delete a user
    pub async fn delete_user(&self, id: u64) -> Result<(), ControlPlaneError> {
        self.delete(&self.url(&format!("/user/{id}"))).await
    }

    /// Create a pre-authentication key for a user
    pub async fn create_preauth_key(
        &self,
        user_id: u64,
        reusable: bool,
        ephemeral: bool,
        expiration: chrono::DateTime<chrono::Utc>,
    ) -> Result<PreAuthKey, ControlPlaneError> {
        let body = CreatePreAuthKeyRequest {
            user: user_id,
            reusable,
            ephemeral,
            expiration,
        };
        let resp: PreAuthKeyResponse = self.post(&self.url("/preauthkey"), &body).await?;
        Ok(resp.pre_auth_key)
    }

    async fn get<R: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<R, ControlPlaneError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::read_response(response).await
    }

    async fn post<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<R, ControlPlaneError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::read_response(response).await
    }

    async fn delete(&self, url: &str) -> Result<(), ControlPlaneError> {
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    async fn read_response<R: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<R, ControlPlaneError> {
        if response.status().is_success() {
            response.json().await.map_err(ControlPlaneError::Request)
        } else {
            Err(api_error(response).await)
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ControlPlaneError {
    if e.is_timeout() {
        ControlPlaneError::Timeout
    } else if e.is_connect() {
        ControlPlaneError::Unavailable
    } else {
        ControlPlaneError::Request(e)
    }
}

async fn api_error(response: reqwest::Response) -> ControlPlaneError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    ControlPlaneError::Api {
        status: status.as_u16(),
        message,
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct Empty {}

#[derive(Debug, Serialize)]
struct MoveNodeRequest {
    user: String,
}

#[derive(Debug, Serialize)]
struct SetTagsRequest {
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ApproveRoutesRequest {
    routes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreatePreAuthKeyRequest {
    user: u64,
    reusable: bool,
    ephemeral: bool,
    expiration: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    #[serde(default)]
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct NodeResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: User,
}

#[derive(Debug, Deserialize)]
struct PreAuthKeyResponse {
    pre_auth_key: PreAuthKey,
}

/// A pre-authentication key as returned by the control plane
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreAuthKey {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub reusable: bool,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub expiration: Option<chrono::DateTime<chrono::Utc>>,
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when talking to the control plane
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("Control plane unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControlPlaneConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.request_timeout_ms, 5000);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ControlPlaneClient::new(ControlPlaneConfig {
            base_url: "http://cp.example.com/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.url("/node"), "http://cp.example.com/api/v1/node");
        assert_eq!(
            client.url("/node/3/expire"),
            "http://cp.example.com/api/v1/node/3/expire"
        );
    }
}
