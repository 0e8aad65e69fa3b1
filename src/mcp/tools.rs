//! MCP Tool Definitions
//!
//! The catalog of operations this server exposes, with their input schemas.

use super::protocol::Tool;
use serde_json::{json, Value};

const ORGANIZATION_ID: &str = "The Google Cloud organization ID (e.g. '123456789012').";
const PARENT: &str = "The parent resource: 'organizations/{org_id}', 'folders/{folder_id}' or 'projects/{project_id}'.";

fn location() -> Value {
    json!({
        "type": "string",
        "default": "global",
        "description": "The location of the resource. Defaults to 'global'."
    })
}

fn page_size() -> Value {
    json!({
        "type": "integer",
        "default": 50,
        "minimum": 0,
        "description": "Page size requested from the API; every page is fetched. Defaults to 50."
    })
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.into(),
        description: description.into(),
        input_schema,
    }
}

/// Get all available MCP tools
pub fn get_tools() -> Vec<Tool> {
    vec![
        tool(
            "list_frameworks",
            "Lists the compliance frameworks available in an organization, built-in (CIS, NIST, FedRAMP, ...) or custom.",
            json!({
                "type": "object",
                "properties": {
                    "organization_id": string(ORGANIZATION_ID),
                    "location": location(),
                    "page_size": page_size()
                },
                "required": ["organization_id"]
            }),
        ),
        tool(
            "get_framework",
            "Gets a compliance framework, including its cloud controls and regulatory control mappings.",
            json!({
                "type": "object",
                "properties": {
                    "organization_id": string(ORGANIZATION_ID),
                    "framework_id": string("The ID of the framework to retrieve."),
                    "location": location()
                },
                "required": ["organization_id", "framework_id"]
            }),
        ),
        tool(
            "list_cloud_controls",
            "Lists the cloud controls available in an organization. Cloud controls are the technical checks behind compliance requirements.",
            json!({
                "type": "object",
                "properties": {
                    "organization_id": string(ORGANIZATION_ID),
                    "location": location(),
                    "page_size": page_size()
                },
                "required": ["organization_id"]
            }),
        ),
        tool(
            "get_cloud_control",
            "Gets a cloud control, including its rules, parameters, and enforcement mode.",
            json!({
                "type": "object",
                "properties": {
                    "organization_id": string(ORGANIZATION_ID),
                    "cloud_control_id": string("The ID of the cloud control to retrieve."),
                    "location": location()
                },
                "required": ["organization_id", "cloud_control_id"]
            }),
        ),
        tool(
            "create_cloud_control",
            "Creates a custom cloud control whose CEL expression is evaluated against Cloud Asset Inventory resources. The expression must evaluate to false to raise a finding.",
            json!({
                "type": "object",
                "properties": {
                    "organization_id": string(ORGANIZATION_ID),
                    "cloud_control_id": string("Unique ID for the cloud control (e.g. 'require-secure-boot')."),
                    "display_name": string("Human-readable name for the cloud control."),
                    "description": string("What the cloud control checks for."),
                    "resource_type": string("Cloud Asset Inventory resource type to evaluate (e.g. 'compute.googleapis.com/Instance')."),
                    "cel_expression": string("CEL expression over resource.data; false triggers a finding (e.g. \"has(resource.data.shieldedInstanceConfig) && resource.data.shieldedInstanceConfig.enableSecureBoot\")."),
                    "severity": {
                        "type": "string",
                        "enum": ["CRITICAL", "HIGH", "MEDIUM", "LOW"],
                        "default": "MEDIUM",
                        "description": "Finding severity. Defaults to 'MEDIUM'."
                    },
                    "remediation_instructions": {
                        "type": "string",
                        "default": "",
                        "description": "How to remediate findings raised by this control."
                    },
                    "location": location()
                },
                "required": [
                    "organization_id",
                    "cloud_control_id",
                    "display_name",
                    "description",
                    "resource_type",
                    "cel_expression"
                ]
            }),
        ),
        tool(
            "create_framework",
            "Creates a custom compliance framework from a set of existing cloud controls.",
            json!({
                "type": "object",
                "properties": {
                    "organization_id": string(ORGANIZATION_ID),
                    "framework_id": string("The ID for the new framework (must be unique)."),
                    "display_name": string("Human-readable name for the framework."),
                    "description": string("The framework's purpose."),
                    "cloud_control_ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "IDs of the cloud controls to include."
                    },
                    "location": location()
                },
                "required": [
                    "organization_id",
                    "framework_id",
                    "display_name",
                    "description",
                    "cloud_control_ids"
                ]
            }),
        ),
        tool(
            "list_framework_deployments",
            "Lists the framework deployments of an organization, folder, or project.",
            json!({
                "type": "object",
                "properties": {
                    "parent": string(PARENT),
                    "location": location(),
                    "page_size": page_size()
                },
                "required": ["parent"]
            }),
        ),
        tool(
            "get_framework_deployment",
            "Gets a framework deployment, including its state and configuration.",
            json!({
                "type": "object",
                "properties": {
                    "parent": string(PARENT),
                    "framework_deployment_id": string("The ID of the framework deployment to retrieve."),
                    "location": location()
                },
                "required": ["parent", "framework_deployment_id"]
            }),
        ),
        tool(
            "create_framework_deployment",
            "Deploys a compliance framework to an organization, folder, or project and waits for the deployment to finish. Returns result 'passed', 'failed' or 'timeout'.",
            json!({
                "type": "object",
                "properties": {
                    "parent": string(PARENT),
                    "framework_deployment_id": string("The ID for the new framework deployment."),
                    "framework_name": string("Framework to deploy: 'organizations/{org_id}/locations/{location}/frameworks/{framework_id}', or a framework ID under the parent."),
                    "cloud_controls": string("Comma-separated 'control_id#major_revision' entries (e.g. 'ctrl-a#1, ctrl-b#2'). Malformed entries are skipped."),
                    "framework_version": {
                        "type": ["integer", "string"],
                        "description": "Major revision of the framework to deploy. Latest when omitted."
                    },
                    "enforcement_mode": {
                        "type": "string",
                        "enum": ["DETECTIVE", "PREVENTIVE", "AUDIT"],
                        "default": "DETECTIVE",
                        "description": "Enforcement mode applied to every listed cloud control."
                    },
                    "location": location(),
                    "target_resource": string("Resource the framework applies to. Defaults to the parent.")
                },
                "required": ["parent", "framework_deployment_id", "framework_name", "cloud_controls"]
            }),
        ),
        tool(
            "delete_framework_deployment",
            "Deletes a framework deployment, removing the framework from its target resource, and waits for the deletion to finish.",
            json!({
                "type": "object",
                "properties": {
                    "parent": string(PARENT),
                    "framework_deployment_id": string("The ID of the framework deployment to delete."),
                    "location": location()
                },
                "required": ["parent", "framework_deployment_id"]
            }),
        ),
        tool(
            "list_cloud_control_deployments",
            "Lists the cloud control deployments of an organization, folder, or project.",
            json!({
                "type": "object",
                "properties": {
                    "parent": string(PARENT),
                    "location": location(),
                    "page_size": page_size()
                },
                "required": ["parent"]
            }),
        ),
        tool(
            "get_cloud_control_deployment",
            "Gets a cloud control deployment, including its enforcement mode and state.",
            json!({
                "type": "object",
                "properties": {
                    "parent": string(PARENT),
                    "cloud_control_deployment_id": string("The ID of the cloud control deployment to retrieve."),
                    "location": location()
                },
                "required": ["parent", "cloud_control_deployment_id"]
            }),
        ),
    ]
}
