//! Compliance Service
//!
//! The seam between tool handlers and the remote compliance API, and the
//! explicit "ready or unavailable" state of each service handle.

use super::error::ClassifiedError;
use super::model::{Operation, OperationHandle};
use super::names::{Collection, ParentName, ResourceName};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Operations the compliance API exposes to this server
#[async_trait]
pub trait ComplianceApi: Send + Sync {
    /// List every element of `collection` under `parent`, following pagination
    async fn list(
        &self,
        parent: &ParentName,
        collection: Collection,
        page_size: u32,
    ) -> Result<Vec<Value>>;

    /// Fetch one resource
    async fn get(&self, name: &ResourceName) -> Result<Value>;

    /// Create `id` in `collection`. Returns the resource, or an operation
    /// for long-running creates.
    async fn create(
        &self,
        parent: &ParentName,
        collection: Collection,
        id: &str,
        body: &Value,
    ) -> Result<Value>;

    /// Delete one resource. Returns an operation for long-running deletes.
    async fn delete(&self, name: &ResourceName) -> Result<Value>;

    /// Current state of a long-running operation
    async fn get_operation(&self, handle: &OperationHandle) -> Result<Operation>;
}

/// A service client that was either constructed at startup or failed to be
#[derive(Clone)]
pub enum ServiceHandle {
    Ready(Arc<dyn ComplianceApi>),
    Unavailable { service: &'static str, reason: String },
}

impl ServiceHandle {
    pub fn ready(api: impl ComplianceApi + 'static) -> Self {
        Self::Ready(Arc::new(api))
    }

    /// Record the outcome of the one-time client construction
    pub fn from_init<T: ComplianceApi + 'static>(service: &'static str, result: Result<T>) -> Self {
        match result {
            Ok(api) => {
                tracing::info!("Successfully initialized {} client", service);
                Self::ready(api)
            }
            Err(e) => {
                tracing::error!("Failed to initialize {} client: {:#}", service, e);
                Self::Unavailable {
                    service,
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// The client, or a `ClientUnavailable` error before any remote call is made
    pub fn api(&self) -> Result<&dyn ComplianceApi, ClassifiedError> {
        match self {
            Self::Ready(api) => Ok(api.as_ref()),
            Self::Unavailable { service, reason } => Err(ClassifiedError::client_unavailable(
                format!("{} client not initialized: {}", service, reason),
            )),
        }
    }
}
