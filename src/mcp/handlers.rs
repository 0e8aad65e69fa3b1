//! MCP Tool Handlers
//!
//! One handler per catalog operation. Every handler returns a JSON mapping:
//! the operation's payload on success, `{"error", "details"}` on failure.

use crate::compliance::metadata::{count_entries, parse_control_metadata_with_mode};
use crate::compliance::model::{
    cloud_control_body, framework_body, FrameworkReference, SEVERITIES,
};
use crate::compliance::names::DEFAULT_LOCATION;
use crate::compliance::{
    classify, ClassifiedError, Collection, ComplianceApi, EnforcementMode, ErrorKind,
    FrameworkDeploymentSpec, Location, Operation, OperationPoller, ParentName, PollOutcome,
    PrincipalPath, ResourceName, ServiceHandle,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::num::NonZeroU64;
use tracing::Instrument;
use uuid::Uuid;

/// Result of a single operation before it is flattened into a mapping
pub type ToolOutcome = Result<Value, ClassifiedError>;

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_severity() -> String {
    "MEDIUM".to_string()
}

#[derive(Debug, Deserialize)]
pub struct OrganizationListArgs {
    pub organization_id: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct GetFrameworkArgs {
    pub organization_id: String,
    pub framework_id: String,
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct GetCloudControlArgs {
    pub organization_id: String,
    pub cloud_control_id: String,
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCloudControlArgs {
    pub organization_id: String,
    pub cloud_control_id: String,
    pub display_name: String,
    pub description: String,
    pub resource_type: String,
    pub cel_expression: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default)]
    pub remediation_instructions: String,
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFrameworkArgs {
    pub organization_id: String,
    pub framework_id: String,
    pub display_name: String,
    pub description: String,
    pub cloud_control_ids: Vec<String>,
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentListArgs {
    pub parent: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct FrameworkDeploymentArgs {
    pub parent: String,
    pub framework_deployment_id: String,
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct CloudControlDeploymentArgs {
    pub parent: String,
    pub cloud_control_deployment_id: String,
    #[serde(default = "default_location")]
    pub location: String,
}

/// Framework revision given either as a number or a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RevisionArg {
    Number(u64),
    Text(String),
}

impl RevisionArg {
    fn into_revision(self) -> Result<Option<NonZeroU64>, ClassifiedError> {
        let raw = match self {
            Self::Number(n) => n,
            Self::Text(text) if text.trim().is_empty() => return Ok(None),
            Self::Text(text) => text.trim().parse::<u64>().map_err(|_| {
                ClassifiedError::malformed(format!("framework_version '{}' is not a number", text))
            })?,
        };

        NonZeroU64::new(raw)
            .map(Some)
            .ok_or_else(|| ClassifiedError::malformed("framework_version must be positive"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFrameworkDeploymentArgs {
    pub parent: String,
    pub framework_deployment_id: String,
    pub framework_name: String,
    pub cloud_controls: String,
    #[serde(default)]
    pub framework_version: Option<RevisionArg>,
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub target_resource: Option<String>,
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ClassifiedError> {
    // Tools without required params may be called with no arguments at all
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| ClassifiedError::malformed(format!("Invalid arguments: {}", e)))
}

fn org_parent(organization_id: &str, location: &str) -> Result<ParentName, ClassifiedError> {
    Ok(ParentName::new(
        PrincipalPath::organization(organization_id)?,
        Location::new(location)?,
    ))
}

fn principal_parent(parent: &str, location: &str) -> Result<ParentName, ClassifiedError> {
    Ok(ParentName::from_parts(parent, location)?)
}

/// A full framework name, or a bare framework id under `parent`
fn framework_reference(
    framework_name: &str,
    parent: &ParentName,
) -> Result<ResourceName, ClassifiedError> {
    let framework_name = framework_name.trim();
    if !framework_name.contains('/') {
        return Ok(parent.child(Collection::Frameworks, framework_name)?);
    }

    let framework = ResourceName::parse(framework_name)?;
    if framework.collection() != Collection::Frameworks {
        return Err(ClassifiedError::malformed(format!(
            "'{}' is not a framework name",
            framework_name
        )));
    }
    Ok(framework)
}

fn list_mapping(key: &str, items: Vec<Value>) -> Value {
    let count = items.len();
    json!({ key: items, "count": count })
}

/// Classify a remote failure, naming what it was about
fn remote_error(subject: &str) -> impl FnOnce(anyhow::Error) -> ClassifiedError + '_ {
    move |e| classify(&e).about(subject)
}

/// Tool handlers with access to both compliance services
pub struct ToolHandlers {
    config: ServiceHandle,
    deployment: ServiceHandle,
    poller: OperationPoller,
}

impl ToolHandlers {
    pub fn new(config: ServiceHandle, deployment: ServiceHandle, poller: OperationPoller) -> Self {
        Self {
            config,
            deployment,
            poller,
        }
    }

    /// Handle a tool call by name. `None` when no such tool exists.
    pub async fn call(&self, name: &str, args: Value) -> Option<Value> {
        let span = tracing::info_span!("tool", name = %name, call_id = %Uuid::new_v4());
        let outcome = self.dispatch(name, args).instrument(span.clone()).await?;

        Some(match outcome {
            Ok(value) => value,
            Err(e) => {
                span.in_scope(|| tracing::error!("{}", e));
                e.to_json()
            }
        })
    }

    async fn dispatch(&self, name: &str, args: Value) -> Option<ToolOutcome> {
        let config = &self.config;
        let deployment = &self.deployment;

        let outcome = match name {
            "list_frameworks" => run(config, args, |api, a| self.list_frameworks(api, a)).await,
            "get_framework" => run(config, args, |api, a| self.get_framework(api, a)).await,
            "list_cloud_controls" => {
                run(config, args, |api, a| self.list_cloud_controls(api, a)).await
            }
            "get_cloud_control" => run(config, args, |api, a| self.get_cloud_control(api, a)).await,
            "create_cloud_control" => {
                run(config, args, |api, a| self.create_cloud_control(api, a)).await
            }
            "create_framework" => run(config, args, |api, a| self.create_framework(api, a)).await,
            "list_framework_deployments" => {
                run(deployment, args, |api, a| self.list_framework_deployments(api, a)).await
            }
            "get_framework_deployment" => {
                run(deployment, args, |api, a| self.get_framework_deployment(api, a)).await
            }
            "create_framework_deployment" => {
                run(deployment, args, |api, a| self.create_framework_deployment(api, a)).await
            }
            "delete_framework_deployment" => {
                run(deployment, args, |api, a| self.delete_framework_deployment(api, a)).await
            }
            "list_cloud_control_deployments" => {
                run(deployment, args, |api, a| self.list_cloud_control_deployments(api, a)).await
            }
            "get_cloud_control_deployment" => {
                run(deployment, args, |api, a| self.get_cloud_control_deployment(api, a)).await
            }
            _ => return None,
        };

        Some(outcome)
    }

    // =========================================================================
    // Frameworks and cloud controls
    // =========================================================================

    async fn list_frameworks(
        &self,
        api: &dyn ComplianceApi,
        args: OrganizationListArgs,
    ) -> ToolOutcome {
        let parent = org_parent(&args.organization_id, &args.location)?;
        tracing::info!("Listing frameworks for parent: {}", parent);

        let subject = format!("organization '{}'", args.organization_id);
        let frameworks = api
            .list(&parent, Collection::Frameworks, args.page_size)
            .await
            .map_err(remote_error(&subject))?;

        Ok(list_mapping("frameworks", frameworks))
    }

    async fn get_framework(&self, api: &dyn ComplianceApi, args: GetFrameworkArgs) -> ToolOutcome {
        let name = org_parent(&args.organization_id, &args.location)?
            .child(Collection::Frameworks, &args.framework_id)?;
        tracing::info!("Getting framework: {}", name);

        let subject = format!("framework '{}'", args.framework_id);
        api.get(&name).await.map_err(remote_error(&subject))
    }

    async fn list_cloud_controls(
        &self,
        api: &dyn ComplianceApi,
        args: OrganizationListArgs,
    ) -> ToolOutcome {
        let parent = org_parent(&args.organization_id, &args.location)?;
        tracing::info!("Listing cloud controls for parent: {}", parent);

        let subject = format!("organization '{}'", args.organization_id);
        let controls = api
            .list(&parent, Collection::CloudControls, args.page_size)
            .await
            .map_err(remote_error(&subject))?;

        Ok(list_mapping("cloud_controls", controls))
    }

    async fn get_cloud_control(
        &self,
        api: &dyn ComplianceApi,
        args: GetCloudControlArgs,
    ) -> ToolOutcome {
        let name = org_parent(&args.organization_id, &args.location)?
            .child(Collection::CloudControls, &args.cloud_control_id)?;
        tracing::info!("Getting cloud control: {}", name);

        let subject = format!("cloud control '{}'", args.cloud_control_id);
        api.get(&name).await.map_err(remote_error(&subject))
    }

    async fn create_cloud_control(
        &self,
        api: &dyn ComplianceApi,
        args: CreateCloudControlArgs,
    ) -> ToolOutcome {
        let parent = org_parent(&args.organization_id, &args.location)?;
        let name = parent.child(Collection::CloudControls, &args.cloud_control_id)?;

        let severity = args.severity.to_uppercase();
        if !SEVERITIES.contains(&severity.as_str()) {
            return Err(ClassifiedError::malformed(format!(
                "severity '{}' must be one of {}",
                args.severity,
                SEVERITIES.join(", ")
            )));
        }

        tracing::info!("Creating cloud control '{}' in parent: {}", name.id(), parent);
        tracing::debug!(
            "Resource type: {}, CEL expression: {}",
            args.resource_type,
            args.cel_expression
        );

        let body = cloud_control_body(
            &args.display_name,
            &args.description,
            &args.resource_type,
            &args.cel_expression,
            &severity,
            &args.remediation_instructions,
        );

        let subject = format!("cloud control '{}'", args.cloud_control_id);
        let created = api
            .create(&parent, Collection::CloudControls, name.id(), &body)
            .await
            .map_err(remote_error(&subject))?;

        Ok(json!({
            "status": "success",
            "cloud_control": created,
            "configuration": {
                "resource_type": args.resource_type,
                "cel_expression": args.cel_expression,
                "severity": severity,
                "remediation_instructions": args.remediation_instructions,
            },
        }))
    }

    async fn create_framework(
        &self,
        api: &dyn ComplianceApi,
        args: CreateFrameworkArgs,
    ) -> ToolOutcome {
        let parent = org_parent(&args.organization_id, &args.location)?;
        let name = parent.child(Collection::Frameworks, &args.framework_id)?;
        let controls = args
            .cloud_control_ids
            .iter()
            .map(|id| parent.child(Collection::CloudControls, id.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            "Creating framework '{}' with {} cloud controls in parent: {}",
            name.id(),
            controls.len(),
            parent
        );

        let body = framework_body(&args.display_name, &args.description, &controls);
        let created = api
            .create(&parent, Collection::Frameworks, name.id(), &body)
            .await
            .map_err(|e| {
                let classified = classify(&e);
                if classified.kind == ErrorKind::NotFound {
                    classified.about("one or more cloud controls")
                } else {
                    classified.about(&format!("framework '{}'", args.framework_id))
                }
            })?;

        Ok(json!({
            "status": "success",
            "framework": created,
        }))
    }

    // =========================================================================
    // Deployments
    // =========================================================================

    async fn list_framework_deployments(
        &self,
        api: &dyn ComplianceApi,
        args: DeploymentListArgs,
    ) -> ToolOutcome {
        let parent = principal_parent(&args.parent, &args.location)?;
        tracing::info!("Listing framework deployments for parent: {}", parent);

        let subject = format!("parent resource '{}'", args.parent);
        let deployments = api
            .list(&parent, Collection::FrameworkDeployments, args.page_size)
            .await
            .map_err(remote_error(&subject))?;

        Ok(list_mapping("framework_deployments", deployments))
    }

    async fn get_framework_deployment(
        &self,
        api: &dyn ComplianceApi,
        args: FrameworkDeploymentArgs,
    ) -> ToolOutcome {
        let name = principal_parent(&args.parent, &args.location)?
            .child(Collection::FrameworkDeployments, &args.framework_deployment_id)?;
        tracing::info!("Getting framework deployment: {}", name);

        let subject = format!("framework deployment '{}'", args.framework_deployment_id);
        api.get(&name).await.map_err(remote_error(&subject))
    }

    async fn create_framework_deployment(
        &self,
        api: &dyn ComplianceApi,
        args: CreateFrameworkDeploymentArgs,
    ) -> ToolOutcome {
        let parent = principal_parent(&args.parent, &args.location)?;
        let name = parent.child(Collection::FrameworkDeployments, &args.framework_deployment_id)?;

        let framework = framework_reference(&args.framework_name, &parent)?;

        let major_revision_id = match args.framework_version {
            Some(version) => version.into_revision()?,
            None => None,
        };

        let target_resource = match args.target_resource.as_deref().map(str::trim) {
            Some(target) if !target.is_empty() => PrincipalPath::parse(target)?,
            _ => parent.principal().clone(),
        };

        let control_metadata = parse_control_metadata_with_mode(
            &args.cloud_controls,
            &parent,
            args.enforcement_mode,
        );
        let requested = count_entries(&args.cloud_controls);
        let parsed = control_metadata.len();
        if parsed < requested {
            tracing::warn!(
                "{} of {} cloud control entries were malformed and skipped",
                requested - parsed,
                requested
            );
        }

        let spec = FrameworkDeploymentSpec {
            name,
            framework_reference: FrameworkReference {
                framework,
                major_revision_id,
            },
            control_metadata,
            target_resource,
        };

        tracing::info!(
            "Creating framework deployment '{}' of {} on {}",
            spec.name.id(),
            spec.framework_reference.framework,
            spec.target_resource
        );

        let subject = format!("framework deployment '{}'", args.framework_deployment_id);
        let response = api
            .create(
                &parent,
                Collection::FrameworkDeployments,
                spec.name.id(),
                &spec.to_request_body(),
            )
            .await
            .map_err(|e| {
                let classified = classify(&e);
                if classified.kind == ErrorKind::NotFound {
                    classified.about(&format!(
                        "parent resource '{}' or framework '{}'",
                        args.parent, args.framework_name
                    ))
                } else {
                    classified.about(&subject)
                }
            })?;

        let operation = Operation::from_value(response).map_err(|e| classify(&e))?;
        tracing::info!("Waiting for framework deployment creation to complete...");
        let outcome = self.poller.await_completion(api, &operation.handle()).await;

        let mut result = outcome.to_json();
        result["operation"] = Value::String(operation.name);
        result["cloud_controls_parsed"] = json!(parsed);
        result["cloud_controls_skipped"] = json!(requested - parsed);
        if let PollOutcome::Passed(Some(deployment)) = outcome {
            result["framework_deployment"] = deployment;
        }

        Ok(result)
    }

    async fn delete_framework_deployment(
        &self,
        api: &dyn ComplianceApi,
        args: FrameworkDeploymentArgs,
    ) -> ToolOutcome {
        let name = principal_parent(&args.parent, &args.location)?
            .child(Collection::FrameworkDeployments, &args.framework_deployment_id)?;
        tracing::info!("Deleting framework deployment: {}", name);

        let subject = format!("framework deployment '{}'", args.framework_deployment_id);
        let response = api.delete(&name).await.map_err(remote_error(&subject))?;

        let nothing_to_wait_on =
            response.is_null() || response.as_object().is_some_and(|o| o.is_empty());
        if nothing_to_wait_on {
            return Ok(json!({
                "result": PollOutcome::Passed(None).as_str(),
                "message": format!("Framework deployment '{}' deleted.", args.framework_deployment_id),
            }));
        }

        let operation = Operation::from_value(response).map_err(|e| classify(&e))?;
        tracing::info!("Waiting for framework deployment deletion to complete...");
        let outcome = self.poller.await_completion(api, &operation.handle()).await;

        let mut result = outcome.to_json();
        result["operation"] = Value::String(operation.name);
        if matches!(outcome, PollOutcome::Passed(_)) {
            result["message"] = json!(format!(
                "Framework deployment '{}' deleted.",
                args.framework_deployment_id
            ));
        }

        Ok(result)
    }

    async fn list_cloud_control_deployments(
        &self,
        api: &dyn ComplianceApi,
        args: DeploymentListArgs,
    ) -> ToolOutcome {
        let parent = principal_parent(&args.parent, &args.location)?;
        tracing::info!("Listing cloud control deployments for parent: {}", parent);

        let subject = format!("parent resource '{}'", args.parent);
        let deployments = api
            .list(&parent, Collection::CloudControlDeployments, args.page_size)
            .await
            .map_err(remote_error(&subject))?;

        Ok(list_mapping("cloud_control_deployments", deployments))
    }

    async fn get_cloud_control_deployment(
        &self,
        api: &dyn ComplianceApi,
        args: CloudControlDeploymentArgs,
    ) -> ToolOutcome {
        let name = principal_parent(&args.parent, &args.location)?.child(
            Collection::CloudControlDeployments,
            &args.cloud_control_deployment_id,
        )?;
        tracing::info!("Getting cloud control deployment: {}", name);

        let subject = format!("cloud control deployment '{}'", args.cloud_control_deployment_id);
        api.get(&name).await.map_err(remote_error(&subject))
    }
}

/// Check the service handle, then decode arguments, then run the operation.
/// No remote call is attempted when the handle is unavailable.
async fn run<'a, T, F, Fut>(handle: &'a ServiceHandle, args: Value, op: F) -> ToolOutcome
where
    T: DeserializeOwned,
    F: FnOnce(&'a dyn ComplianceApi, T) -> Fut,
    Fut: Future<Output = ToolOutcome> + 'a,
{
    let api = handle.api()?;
    let args = parse_args(args)?;
    op(api, args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::model::{OperationError, OperationHandle};
    use crate::gcp::ApiError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory compliance API that records what it was asked to do
    #[derive(Default)]
    struct FakeApi {
        items: Vec<Value>,
        failure: Option<ApiError>,
        create_response: Value,
        operations: Mutex<VecDeque<Operation>>,
        calls: AtomicUsize,
        bodies: Mutex<Vec<Value>>,
    }

    impl FakeApi {
        fn failing(code: u16, status: &str, message: &str) -> Self {
            Self {
                failure: Some(ApiError {
                    code,
                    status: Some(status.to_string()),
                    message: message.to_string(),
                }),
                ..Default::default()
            }
        }

        fn with_operations(create_response: Value, operations: Vec<Operation>) -> Self {
            Self {
                create_response,
                operations: Mutex::new(operations.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_body(&self) -> Value {
            self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
        }

        fn check(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(error) => Err(error.clone().into()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ComplianceApi for FakeApi {
        async fn list(&self, _: &ParentName, _: Collection, _: u32) -> anyhow::Result<Vec<Value>> {
            self.check()?;
            Ok(self.items.clone())
        }

        async fn get(&self, name: &ResourceName) -> anyhow::Result<Value> {
            self.check()?;
            Ok(json!({ "name": name.to_string() }))
        }

        async fn create(
            &self,
            _: &ParentName,
            _: Collection,
            _: &str,
            body: &Value,
        ) -> anyhow::Result<Value> {
            self.check()?;
            self.bodies.lock().unwrap().push(body.clone());
            Ok(self.create_response.clone())
        }

        async fn delete(&self, _: &ResourceName) -> anyhow::Result<Value> {
            self.check()?;
            Ok(self.create_response.clone())
        }

        async fn get_operation(&self, handle: &OperationHandle) -> anyhow::Result<Operation> {
            self.check()?;
            let next = self.operations.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| running(handle.as_str())))
        }
    }

    fn running(name: &str) -> Operation {
        Operation {
            name: name.to_string(),
            done: false,
            error: None,
            response: None,
        }
    }

    fn finished(name: &str, error: Option<&str>) -> Operation {
        Operation {
            name: name.to_string(),
            done: true,
            error: error.map(|message| OperationError {
                code: 9,
                message: message.to_string(),
            }),
            response: error.is_none().then(|| json!({"name": "fd-1", "state": "ACTIVE"})),
        }
    }

    fn handlers(api: Arc<FakeApi>) -> ToolHandlers {
        ToolHandlers::new(
            ServiceHandle::Ready(api.clone()),
            ServiceHandle::Ready(api),
            OperationPoller::new(Duration::from_secs(10), 30),
        )
    }

    fn unavailable(service: &'static str) -> ServiceHandle {
        ServiceHandle::Unavailable {
            service,
            reason: "no credentials".to_string(),
        }
    }

    fn deployment_args(cloud_controls: &str) -> Value {
        json!({
            "parent": "organizations/123",
            "framework_deployment_id": "fd-1",
            "framework_name": "organizations/123/locations/global/frameworks/cis",
            "cloud_controls": cloud_controls,
        })
    }

    #[tokio::test]
    async fn test_unavailable_clients_fail_before_anything_else() {
        let handlers = ToolHandlers::new(
            unavailable("Config"),
            unavailable("Deployment"),
            OperationPoller::default(),
        );

        for tool in crate::mcp::tools::get_tools() {
            // Arguments are deliberately missing: the handle check comes first
            let result = handlers.call(&tool.name, Value::Null).await.unwrap();
            assert_eq!(result["error"], "ClientUnavailable", "{}", tool.name);
        }

        let result = handlers
            .call("list_frameworks", json!({"organization_id": "123"}))
            .await
            .unwrap();
        assert_eq!(
            result["details"],
            "Config client not initialized: no credentials"
        );
    }

    #[tokio::test]
    async fn test_deployment_client_is_independent() {
        let api = Arc::new(FakeApi::default());
        let handlers = ToolHandlers::new(
            ServiceHandle::Ready(api.clone()),
            unavailable("Deployment"),
            OperationPoller::default(),
        );

        let frameworks = handlers
            .call("list_frameworks", json!({"organization_id": "123"}))
            .await
            .unwrap();
        assert_eq!(frameworks["count"], 0);

        let deployments = handlers
            .call("list_framework_deployments", json!({"parent": "projects/p"}))
            .await
            .unwrap();
        assert_eq!(deployments["error"], "ClientUnavailable");
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let handlers = handlers(Arc::new(FakeApi::default()));
        assert!(handlers.call("drop_database", json!({})).await.is_none());
    }

    #[tokio::test]
    async fn test_list_returns_items_and_count() {
        let api = Arc::new(FakeApi {
            items: vec![json!({"name": "a"}), json!({"name": "b"})],
            ..Default::default()
        });
        let handlers = handlers(api);

        let result = handlers
            .call(
                "list_cloud_control_deployments",
                json!({"parent": "folders/42", "page_size": 10}),
            )
            .await
            .unwrap();

        assert_eq!(result["count"], 2);
        assert_eq!(result["cloud_control_deployments"][1]["name"], "b");
    }

    #[tokio::test]
    async fn test_get_builds_full_resource_name() {
        let handlers = handlers(Arc::new(FakeApi::default()));

        let result = handlers
            .call(
                "get_framework",
                json!({"organization_id": "123", "framework_id": "cis", "location": "us-central1"}),
            )
            .await
            .unwrap();

        assert_eq!(
            result["name"],
            "organizations/123/locations/us-central1/frameworks/cis"
        );
    }

    #[tokio::test]
    async fn test_not_found_names_the_subject() {
        let api = Arc::new(FakeApi::failing(404, "NOT_FOUND", "Resource missing"));
        let handlers = handlers(api);

        let result = handlers
            .call(
                "get_framework",
                json!({"organization_id": "123", "framework_id": "cis"}),
            )
            .await
            .unwrap();

        assert_eq!(result["error"], "NotFound");
        assert_eq!(
            result["details"],
            "Could not find framework 'cis'. Resource missing"
        );
    }

    #[tokio::test]
    async fn test_permission_denied_is_classified() {
        let api = Arc::new(FakeApi::failing(403, "PERMISSION_DENIED", "caller lacks access"));
        let handlers = handlers(api);

        let result = handlers
            .call("list_frameworks", json!({"organization_id": "123"}))
            .await
            .unwrap();

        assert_eq!(result["error"], "PermissionDenied");
        assert_eq!(result["details"], "caller lacks access");
    }

    #[tokio::test]
    async fn test_malformed_parent_makes_no_remote_call() {
        let api = Arc::new(FakeApi::default());
        let handlers = handlers(api.clone());

        let result = handlers
            .call("list_framework_deployments", json!({"parent": "billingAccounts/1"}))
            .await
            .unwrap();

        assert_eq!(result["error"], "MalformedInput");
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_arguments_are_malformed() {
        let handlers = handlers(Arc::new(FakeApi::default()));

        let result = handlers
            .call("get_cloud_control", json!({"organization_id": "123"}))
            .await
            .unwrap();

        assert_eq!(result["error"], "MalformedInput");
        assert!(result["details"]
            .as_str()
            .unwrap()
            .contains("cloud_control_id"));
    }

    #[tokio::test]
    async fn test_create_cloud_control_severity() {
        let api = Arc::new(FakeApi {
            create_response: json!({"name": "cc"}),
            ..Default::default()
        });
        let handlers = handlers(api.clone());
        let mut args = json!({
            "organization_id": "123",
            "cloud_control_id": "require-secure-boot",
            "display_name": "Secure boot",
            "description": "Instances boot securely",
            "resource_type": "compute.googleapis.com/Instance",
            "cel_expression": "resource.data.shieldedInstanceConfig.enableSecureBoot",
            "severity": "urgent",
        });

        let rejected = handlers.call("create_cloud_control", args.clone()).await.unwrap();
        assert_eq!(rejected["error"], "MalformedInput");
        assert_eq!(api.calls(), 0);

        args["severity"] = json!("high");
        let created = handlers.call("create_cloud_control", args).await.unwrap();
        assert_eq!(created["status"], "success");
        assert_eq!(created["configuration"]["severity"], "HIGH");
        assert_eq!(api.last_body()["severity"], "HIGH");
        assert!(api.last_body().get("remediationSteps").is_none());
    }

    #[tokio::test]
    async fn test_create_framework_references_controls_by_name() {
        let api = Arc::new(FakeApi {
            create_response: json!({"name": "fw"}),
            ..Default::default()
        });
        let handlers = handlers(api.clone());

        let result = handlers
            .call(
                "create_framework",
                json!({
                    "organization_id": "123",
                    "framework_id": "baseline",
                    "display_name": "Baseline",
                    "description": "Org baseline",
                    "cloud_control_ids": ["a", "b"],
                }),
            )
            .await
            .unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(
            api.last_body()["cloudControlDetails"][1]["name"],
            "organizations/123/locations/global/cloudControls/b"
        );
    }

    #[tokio::test]
    async fn test_create_framework_duplicate() {
        let api = Arc::new(FakeApi::failing(409, "ALREADY_EXISTS", "duplicate"));
        let handlers = handlers(api);

        let result = handlers
            .call(
                "create_framework",
                json!({
                    "organization_id": "123",
                    "framework_id": "baseline",
                    "display_name": "Baseline",
                    "description": "Org baseline",
                    "cloud_control_ids": [],
                }),
            )
            .await
            .unwrap();

        assert_eq!(result["error"], "AlreadyExists");
        assert_eq!(
            result["details"],
            "Framework 'baseline' already exists. duplicate"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_deployment_passes() {
        let api = Arc::new(FakeApi::with_operations(
            json!({"name": "operations/op-1"}),
            vec![finished("operations/op-1", None)],
        ));
        let handlers = handlers(api.clone());
        let mut args = deployment_args("a#1, bad-entry, b#x, c#2");
        args["framework_version"] = json!("3");

        let result = handlers
            .call("create_framework_deployment", args)
            .await
            .unwrap();

        assert_eq!(result["result"], "passed");
        assert_eq!(result["operation"], "operations/op-1");
        assert_eq!(result["cloud_controls_parsed"], 2);
        assert_eq!(result["cloud_controls_skipped"], 2);
        assert_eq!(result["framework_deployment"]["state"], "ACTIVE");

        let body = api.last_body();
        assert_eq!(body["framework"]["majorRevisionId"], "3");
        assert_eq!(
            body["targetResourceConfig"]["existingTargetResource"],
            "organizations/123"
        );
        assert_eq!(
            body["cloudControlMetadata"][1]["cloudControlDetails"]["name"],
            "organizations/123/locations/global/cloudControls/c"
        );
        assert_eq!(body["cloudControlMetadata"][0]["enforcementMode"], "DETECTIVE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_deployment_reports_operation_failure() {
        let api = Arc::new(FakeApi::with_operations(
            json!({"name": "operations/op-2"}),
            vec![
                running("operations/op-2"),
                finished("operations/op-2", Some("framework revision not found")),
            ],
        ));
        let handlers = handlers(api.clone());
        let mut args = deployment_args("a#1");
        args["enforcement_mode"] = json!("PREVENTIVE");

        let result = handlers
            .call("create_framework_deployment", args)
            .await
            .unwrap();

        assert_eq!(result["result"], "failed");
        assert_eq!(result["error"], "framework revision not found");
        assert!(result.get("framework_deployment").is_none());
        assert_eq!(
            api.last_body()["cloudControlMetadata"][0]["enforcementMode"],
            "PREVENTIVE"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_deployment_times_out() {
        let api = Arc::new(FakeApi::with_operations(
            json!({"name": "operations/op-3"}),
            Vec::new(),
        ));
        let handlers = handlers(api.clone());
        let start = tokio::time::Instant::now();

        let result = handlers
            .call("create_framework_deployment", deployment_args("a#1"))
            .await
            .unwrap();

        assert_eq!(result["result"], "timeout");
        assert_eq!(result["operation"], "operations/op-3");
        // One create plus thirty operation queries
        assert_eq!(api.calls(), 31);
        assert_eq!(start.elapsed(), Duration::from_secs(290));
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_are_named_under_deployment_parent() {
        let api = Arc::new(FakeApi::with_operations(
            json!({"name": "operations/op-5"}),
            vec![finished("operations/op-5", None)],
        ));
        let handlers = handlers(api.clone());
        let args = json!({
            "parent": "projects/p",
            "framework_deployment_id": "fd-1",
            "framework_name": "organizations/1/locations/global/frameworks/cis",
            "cloud_controls": "a#1",
        });

        let result = handlers
            .call("create_framework_deployment", args)
            .await
            .unwrap();

        assert_eq!(result["result"], "passed");
        let body = api.last_body();
        assert_eq!(
            body["cloudControlMetadata"][0]["cloudControlDetails"]["name"],
            "projects/p/locations/global/cloudControls/a"
        );
        assert_eq!(
            body["framework"]["framework"],
            "organizations/1/locations/global/frameworks/cis"
        );
        assert_eq!(
            body["targetResourceConfig"]["existingTargetResource"],
            "projects/p"
        );
    }

    #[tokio::test]
    async fn test_delete_with_empty_body_passes_without_polling() {
        let api = Arc::new(FakeApi::with_operations(json!({}), Vec::new()));
        let handlers = handlers(api.clone());

        let result = handlers
            .call(
                "delete_framework_deployment",
                json!({"parent": "projects/p", "framework_deployment_id": "fd-1"}),
            )
            .await
            .unwrap();

        assert_eq!(result["result"], "passed");
        assert_eq!(result["message"], "Framework deployment 'fd-1' deleted.");
        // The delete itself, and no operation queries
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_deployment_rejects_non_framework_name() {
        let api = Arc::new(FakeApi::default());
        let handlers = handlers(api.clone());
        let mut args = deployment_args("a#1");
        args["framework_name"] = json!("organizations/123/locations/global/cloudControls/a");

        let result = handlers
            .call("create_framework_deployment", args)
            .await
            .unwrap();

        assert_eq!(result["error"], "MalformedInput");
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_deployment_waits_for_operation() {
        let api = Arc::new(FakeApi::with_operations(
            json!({"name": "operations/op-4", "done": false}),
            vec![finished("operations/op-4", None)],
        ));
        let handlers = handlers(api);

        let result = handlers
            .call(
                "delete_framework_deployment",
                json!({"parent": "projects/p", "framework_deployment_id": "fd-1"}),
            )
            .await
            .unwrap();

        assert_eq!(result["result"], "passed");
        assert_eq!(result["operation"], "operations/op-4");
        assert_eq!(result["message"], "Framework deployment 'fd-1' deleted.");
    }

    #[test]
    fn test_framework_reference_forms() {
        let parent = ParentName::from_parts("organizations/123", "us-east1").unwrap();

        let bare = framework_reference(" cis ", &parent).unwrap();
        assert_eq!(
            bare.to_string(),
            "organizations/123/locations/us-east1/frameworks/cis"
        );

        let full =
            framework_reference("organizations/9/locations/global/frameworks/nist", &parent)
                .unwrap();
        assert_eq!(full.parent().principal().id(), "9");

        let partial = framework_reference("organizations/9/frameworks/nist", &parent);
        assert_eq!(partial.unwrap_err().kind, ErrorKind::MalformedInput);
    }

    #[test]
    fn test_revision_arg() {
        let number: RevisionArg = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(number.into_revision().unwrap(), NonZeroU64::new(2));

        let text: RevisionArg = serde_json::from_value(json!(" 7 ")).unwrap();
        assert_eq!(text.into_revision().unwrap(), NonZeroU64::new(7));

        let blank: RevisionArg = serde_json::from_value(json!("")).unwrap();
        assert_eq!(blank.into_revision().unwrap(), None);

        let zero: RevisionArg = serde_json::from_value(json!(0)).unwrap();
        assert_eq!(
            zero.into_revision().unwrap_err().kind,
            ErrorKind::MalformedInput
        );
    }
}
