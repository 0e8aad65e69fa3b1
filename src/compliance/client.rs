//! Compliance Client
//!
//! REST implementation of [`ComplianceApi`] on top of the authenticated
//! [`GcpClient`].

use super::model::{Operation, OperationHandle};
use super::names::{Collection, ParentName, ResourceName};
use super::service::ComplianceApi;
use crate::gcp::auth::GcpCredentials;
use crate::gcp::client::GcpClient;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Upper bound on pages fetched by a single list call
const MAX_PAGES: usize = 100;

/// How to reach and authenticate against the compliance API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub endpoint: String,
    /// Pre-issued bearer token; Application Default Credentials when unset
    pub access_token: Option<String>,
}

/// Cloud Security Compliance REST client
#[derive(Clone)]
pub struct ComplianceClient {
    gcp: GcpClient,
}

impl ComplianceClient {
    /// Build a client, resolving credentials once
    pub async fn connect(settings: &ClientSettings) -> Result<Self> {
        let gcp = match &settings.access_token {
            Some(token) => GcpClient::with_credentials(
                &settings.endpoint,
                GcpCredentials::from_access_token(token.clone()),
            )?,
            None => GcpClient::new(&settings.endpoint).await?,
        };

        tracing::debug!("Compliance client bound to {}", gcp.endpoint());
        Ok(Self { gcp })
    }

    fn collection_url(&self, parent: &ParentName, collection: Collection) -> String {
        self.gcp.api_url(&format!("{}/{}", parent, collection))
    }
}

#[async_trait]
impl ComplianceApi for ComplianceClient {
    async fn list(
        &self,
        parent: &ParentName,
        collection: Collection,
        page_size: u32,
    ) -> Result<Vec<Value>> {
        let base_url = self.collection_url(parent, collection);
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut params: Vec<(&str, String)> = Vec::new();
            if page_size > 0 {
                params.push(("pageSize", page_size.to_string()));
            }
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self.gcp.get(&add_query_params(&base_url, &params)).await?;

            if let Some(items) = response.get(collection.as_str()).and_then(|v| v.as_array()) {
                all_items.extend(items.iter().cloned());
            }

            page_token = response
                .get("nextPageToken")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string());

            if page_token.is_none() {
                return Ok(all_items);
            }
        }

        tracing::warn!(
            "Stopped listing {} under {} after {} pages",
            collection,
            parent,
            MAX_PAGES
        );
        Ok(all_items)
    }

    async fn get(&self, name: &ResourceName) -> Result<Value> {
        self.gcp.get(&self.gcp.api_url(&name.to_string())).await
    }

    async fn create(
        &self,
        parent: &ParentName,
        collection: Collection,
        id: &str,
        body: &Value,
    ) -> Result<Value> {
        let url = add_query_params(
            &self.collection_url(parent, collection),
            &[(collection.id_param(), id.to_string())],
        );
        self.gcp.post(&url, Some(body)).await
    }

    async fn delete(&self, name: &ResourceName) -> Result<Value> {
        self.gcp.delete(&self.gcp.api_url(&name.to_string())).await
    }

    async fn get_operation(&self, handle: &OperationHandle) -> Result<Operation> {
        let response = self.gcp.get(&self.gcp.api_url(handle.as_str())).await?;
        Operation::from_value(response)
    }
}

/// Append URL-encoded query parameters
fn add_query_params(url: &str, params: &[(&str, String)]) -> String {
    let query_parts: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}
