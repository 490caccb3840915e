//! GCP Client
//!
//! Main client for interacting with the Compute Engine API, combining
//! authentication and HTTP functionality. This is the authenticated handle
//! the reconciliation context carries: typed call helpers live in
//! [`super::compute`].

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;

/// Default Compute Engine API endpoint
const COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub zone: String,
    base_url: String,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(project_id: &str, zone: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            zone: zone.to_string(),
            base_url: COMPUTE_ENDPOINT.to_string(),
        })
    }

    /// Create a client with a fixed token and endpoint (tests, local emulators)
    pub fn with_static_token(project_id: &str, zone: &str, token: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            credentials: GcpCredentials::from_static_token(token),
            http: GcpHttpClient::new()?,
            project_id: project_id.to_string(),
            zone: zone.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Get the region from the current zone
    pub fn get_region(&self) -> String {
        let parts: Vec<&str> = self.zone.rsplitn(2, '-').collect();
        if parts.len() == 2 {
            parts[1].to_string()
        } else {
            self.zone.clone()
        }
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        format!(
            "{}/compute/v1/projects/{}/{}",
            self.base_url, self.project_id, path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, zone: &str, resource: &str) -> String {
        self.compute_url(&format!("zones/{}/{}", zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, resource: &str) -> String {
        self.compute_url(&format!("regions/{}/{}", self.get_region(), resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, resource: &str) -> String {
        self.compute_url(&format!("global/{}", resource))
    }
}
