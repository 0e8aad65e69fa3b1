//! GCP Client
//!
//! Authenticated client for GCP REST APIs, combining credentials
//! and HTTP functionality behind a single service endpoint.

use super::auth::GcpCredentials;
use super::http::{ApiError, GcpHttpClient};
use anyhow::{Context, Result};
use serde_json::Value;

/// Public endpoint of the Cloud Security Compliance API
pub const DEFAULT_ENDPOINT: &str = "https://cloudsecuritycompliance.googleapis.com";

/// API version path segment
const API_VERSION: &str = "v1";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    endpoint: String,
}

impl GcpClient {
    /// Create a new GCP client against `endpoint` using Application Default Credentials
    pub async fn new(endpoint: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(endpoint, credentials)
    }

    /// Create a client from already resolved credentials
    pub fn with_credentials(endpoint: &str, credentials: GcpCredentials) -> Result<Self> {
        let parsed = url::Url::parse(endpoint)
            .with_context(|| format!("Invalid API endpoint: {}", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported endpoint scheme: {}", parsed.scheme());
        }

        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build an API URL for a resource path (e.g. `organizations/1/locations/global/frameworks`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.endpoint, API_VERSION, path.trim_start_matches('/'))
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        match self.http.get(url, &token).await {
            Err(e) if is_unauthenticated(&e) => {
                let token = self.refreshed_token().await?;
                self.http.get(url, &token).await
            }
            other => other,
        }
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        match self.http.post(url, &token, body).await {
            Err(e) if is_unauthenticated(&e) => {
                let token = self.refreshed_token().await?;
                self.http.post(url, &token, body).await
            }
            other => other,
        }
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        match self.http.delete(url, &token).await {
            Err(e) if is_unauthenticated(&e) => {
                let token = self.refreshed_token().await?;
                self.http.delete(url, &token).await
            }
            other => other,
        }
    }

    async fn refreshed_token(&self) -> Result<String> {
        tracing::debug!("Request rejected as unauthenticated, refreshing token");
        self.credentials.invalidate().await;
        self.credentials.get_token().await
    }
}

/// A 401 usually means the cached token went stale before its assumed TTL
fn is_unauthenticated(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .is_some_and(|e| e.code == 401)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> Result<GcpClient> {
        GcpClient::with_credentials(endpoint, GcpCredentials::from_access_token("token"))
    }

    #[test]
    fn test_api_url() {
        let client = client("https://example.test/").unwrap();
        assert_eq!(client.endpoint(), "https://example.test");
        assert_eq!(
            client.api_url("organizations/1/locations/global/frameworks"),
            "https://example.test/v1/organizations/1/locations/global/frameworks"
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(client("not a url").is_err());
        assert!(client("ftp://example.test").is_err());
    }
}
