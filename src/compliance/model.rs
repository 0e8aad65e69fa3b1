//! Wire models for requests sent to and responses read from the compliance API

use super::metadata::ControlMetadataEntry;
use super::names::{PrincipalPath, ResourceName};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::num::NonZeroU64;

/// Severity levels accepted for custom cloud controls
pub const SEVERITIES: &[&str] = &["CRITICAL", "HIGH", "MEDIUM", "LOW"];

/// Name of a long-running operation, e.g.
/// `organizations/1/locations/global/operations/operation-123`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `google.rpc.Status` carried by a failed operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl OperationError {
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            format!("Operation failed with code {}", self.code)
        } else {
            self.message.clone()
        }
    }
}

/// `google.longrunning.Operation`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<Value>,
}

impl Operation {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("Response is not a long-running operation")
    }

    pub fn handle(&self) -> OperationHandle {
        OperationHandle::new(self.name.clone())
    }
}

/// Framework (and optional major revision) a deployment applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkReference {
    pub framework: ResourceName,
    pub major_revision_id: Option<NonZeroU64>,
}

/// Everything needed to create a framework deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkDeploymentSpec {
    pub name: ResourceName,
    pub framework_reference: FrameworkReference,
    pub control_metadata: Vec<ControlMetadataEntry>,
    pub target_resource: PrincipalPath,
}

impl FrameworkDeploymentSpec {
    /// Body of a `CreateFrameworkDeployment` call
    pub fn to_request_body(&self) -> Value {
        let mut framework = Map::new();
        framework.insert(
            "framework".to_string(),
            Value::String(self.framework_reference.framework.to_string()),
        );
        if let Some(revision) = self.framework_reference.major_revision_id {
            framework.insert(
                "majorRevisionId".to_string(),
                Value::String(revision.to_string()),
            );
        }

        json!({
            "targetResourceConfig": {
                "existingTargetResource": self.target_resource.to_string(),
            },
            "framework": framework,
            "cloudControlMetadata": self
                .control_metadata
                .iter()
                .map(ControlMetadataEntry::to_json)
                .collect::<Vec<_>>(),
        })
    }
}

/// Body of a `CreateCloudControl` call
pub fn cloud_control_body(
    display_name: &str,
    description: &str,
    resource_type: &str,
    cel_expression: &str,
    severity: &str,
    remediation_instructions: &str,
) -> Value {
    let mut body = json!({
        "displayName": display_name,
        "description": description,
        "severity": severity,
        "rules": [{
            "description": description,
            "celExpression": {
                "expression": cel_expression,
                "resourceTypesValues": {
                    "values": [resource_type],
                },
            },
        }],
    });

    if !remediation_instructions.is_empty() {
        body["remediationSteps"] = Value::String(remediation_instructions.to_string());
    }

    body
}

/// Body of a `CreateFramework` call referencing each control by full name
pub fn framework_body(display_name: &str, description: &str, controls: &[ResourceName]) -> Value {
    json!({
        "displayName": display_name,
        "description": description,
        "cloudControlDetails": controls
            .iter()
            .map(|name| json!({ "name": name.to_string() }))
            .collect::<Vec<_>>(),
    })
}
