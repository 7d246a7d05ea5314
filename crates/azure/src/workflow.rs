//! `azurerm_logic_app_workflow`: the Logic App workflow shell. Actions and
//! triggers are owned by sibling resources that edit the same remote object,
//! so this resource never touches them after create.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use azlogic_core::{Attribute, LockTable, ProviderError, Resource, ResourceData, Schema};

use crate::id::AzureResourceId;
use crate::logic::{Definition, ParameterType, RemoteError, Workflow, WorkflowParameter, WorkflowProperties, WorkflowsClient};
use crate::{expand_tags, flatten_tags, normalize_location};

pub const RESOURCE_TYPE_NAME: &str = "azurerm_logic_app_workflow";
/// Lock namespace shared with the action/trigger resources.
pub const LOGIC_APP_LOCK_KIND: &str = "azurerm_logic_app";
pub const DEFAULT_WORKFLOW_SCHEMA: &str =
    "https://schema.management.azure.com/providers/Microsoft.Logic/schemas/2016-06-01/workflowdefinition.json#";
pub const DEFAULT_WORKFLOW_VERSION: &str = "1.0.0.0";

const KIND: &str = "Logic App Workflow";

#[derive(Debug, Deserialize)]
struct WorkflowConfig {
    name: String,
    location: String,
    resource_group_name: String,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    workflow_schema: String,
    workflow_version: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

pub struct LogicAppWorkflowResource {
    client: Arc<dyn WorkflowsClient>,
    locks: LockTable,
}

impl LogicAppWorkflowResource {
    pub fn new(client: Arc<dyn WorkflowsClient>, locks: LockTable) -> Self {
        Self { client, locks }
    }

    fn config(&self, d: &mut ResourceData) -> Result<WorkflowConfig, ProviderError> {
        let schema = self.schema();
        schema.apply_defaults(d);
        schema.validate(d)?;
        d.decode()
    }
}

fn remote(operation: &'static str, name: &str, resource_group: &str, err: RemoteError) -> ProviderError {
    ProviderError::Remote {
        operation,
        kind: KIND,
        name: name.to_string(),
        resource_group: resource_group.to_string(),
        source: Box::new(err),
    }
}

/// Resource group and workflow name recorded in the stored id.
fn parse_workflow_id(d: &ResourceData) -> Result<(String, String), ProviderError> {
    let raw = d.id().ok_or_else(|| ProviderError::invalid_id("", "resource has no id"))?;
    let id = AzureResourceId::parse(raw.as_str())?;
    let name = id.segment("workflows")?.to_string();
    Ok((id.resource_group, name))
}

/// Every configured value becomes a `String` parameter.
pub fn expand_parameters(input: &BTreeMap<String, String>) -> BTreeMap<String, Option<WorkflowParameter>> {
    input.iter()
        .map(|(k, v)| {
            let param = WorkflowParameter {
                ty: Some(ParameterType::String),
                value: Some(Json::String(v.clone())),
                ..Default::default()
            };
            (k.clone(), Some(param))
        })
        .collect()
}

/// Inverse of [`expand_parameters`]. Null entries and entries without a
/// value are dropped; non-string values come back as their JSON text.
pub fn flatten_parameters(input: &BTreeMap<String, Option<WorkflowParameter>>) -> BTreeMap<String, String> {
    input.iter()
        .filter_map(|(k, p)| {
            let value = match p.as_ref()?.value.as_ref()? {
                Json::Null => return None,
                Json::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((k.clone(), value))
        })
        .collect()
}

#[async_trait]
impl Resource for LogicAppWorkflowResource {
    fn type_name(&self) -> &'static str { RESOURCE_TYPE_NAME }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("name", Attribute::required_string().force_new())
            .with_attribute("location", Attribute::required_string().force_new())
            .with_attribute("resource_group_name", Attribute::required_string().force_new())
            .with_attribute("parameters", Attribute::optional_map())
            .with_attribute("workflow_schema", Attribute::optional_string().force_new().with_default(DEFAULT_WORKFLOW_SCHEMA))
            .with_attribute("workflow_version", Attribute::optional_string().force_new().with_default(DEFAULT_WORKFLOW_VERSION))
            .with_attribute("tags", Attribute::optional_map().computed())
            .with_attribute("access_endpoint", Attribute::computed_string())
    }

    #[tracing::instrument(skip_all, fields(resource = RESOURCE_TYPE_NAME))]
    async fn create(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        info!("preparing arguments for Logic App Workflow creation");
        let cfg = self.config(d)?;
        let (name, resource_group) = (cfg.name.as_str(), cfg.resource_group_name.as_str());

        let workflow = Workflow {
            location: Some(normalize_location(&cfg.location)),
            tags: Some(expand_tags(&cfg.tags)),
            properties: Some(WorkflowProperties {
                definition: Some(Definition::empty(&cfg.workflow_schema, &cfg.workflow_version)),
                parameters: Some(expand_parameters(&cfg.parameters)),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.client.create_or_update(resource_group, name, workflow).await
            .map_err(|e| remote("creating", name, resource_group, e))?;

        let read = self.client.get(resource_group, name).await
            .map_err(|e| remote("reading", name, resource_group, e))?;
        let id = read.id.ok_or_else(|| remote("reading", name, resource_group, RemoteError::MissingField("id")))?;
        info!(%id, "created Logic App Workflow");
        d.set_id(id);

        self.read(d).await
    }

    #[tracing::instrument(skip_all, fields(resource = RESOURCE_TYPE_NAME, id = ?d.id()))]
    async fn read(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let (resource_group, name) = parse_workflow_id(d)?;

        let resp = match self.client.get(&resource_group, &name).await {
            Ok(wf) => wf,
            Err(e) if e.was_not_found() => {
                info!(%name, %resource_group, "Logic App Workflow was not found, removing from state");
                d.clear_id();
                return Ok(());
            }
            Err(e) => return Err(remote("reading", &name, &resource_group, e)),
        };

        d.set("name", resp.name.as_deref().unwrap_or(&name))?;
        d.set("resource_group_name", &resource_group)?;
        if let Some(location) = &resp.location {
            d.set("location", normalize_location(location))?;
        }

        if let Some(props) = &resp.properties {
            let parameters = props.parameters.as_ref().map(flatten_parameters).unwrap_or_default();
            d.set("parameters", parameters)?;
            d.set("access_endpoint", &props.access_endpoint)?;

            if let Some(Definition { schema: Some(schema), content_version: Some(version), .. }) = &props.definition {
                d.set("workflow_schema", schema)?;
                d.set("workflow_version", version)?;
            }
        }

        d.set("tags", flatten_tags(resp.tags.as_ref()))?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(resource = RESOURCE_TYPE_NAME, id = ?d.id()))]
    async fn update(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let (resource_group, name) = parse_workflow_id(d)?;
        let cfg = self.config(d)?;

        // actions, parameters and triggers of one workflow are edited by several resources
        let _lock = self.locks.lock(&name, LOGIC_APP_LOCK_KIND).await;

        let read = match self.client.get(&resource_group, &name).await {
            Ok(wf) => wf,
            Err(e) if e.was_not_found() => {
                info!(%name, %resource_group, "Logic App Workflow was not found, removing from state");
                d.clear_id();
                return Ok(());
            }
            Err(e) => return Err(remote("reading", &name, &resource_group, e)),
        };
        let existing = read.properties
            .ok_or_else(|| remote("reading", &name, &resource_group, RemoteError::MissingField("properties")))?;

        let workflow = Workflow {
            location: Some(normalize_location(&cfg.location)),
            tags: Some(expand_tags(&cfg.tags)),
            properties: Some(WorkflowProperties {
                definition: existing.definition,
                parameters: Some(expand_parameters(&cfg.parameters)),
                ..Default::default()
            }),
            ..Default::default()
        };

        debug!(%name, %resource_group, "updating Logic App Workflow");
        self.client.create_or_update(&resource_group, &name, workflow).await
            .map_err(|e| remote("updating", &name, &resource_group, e))?;

        self.read(d).await
    }

    #[tracing::instrument(skip_all, fields(resource = RESOURCE_TYPE_NAME, id = ?d.id()))]
    async fn delete(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
        let (resource_group, name) = parse_workflow_id(d)?;

        let _lock = self.locks.lock(&name, LOGIC_APP_LOCK_KIND).await;

        match self.client.delete(&resource_group, &name).await {
            Ok(()) => info!(%name, %resource_group, "deleted Logic App Workflow"),
            Err(e) if e.was_not_found() => debug!(%name, %resource_group, "Logic App Workflow already gone"),
            Err(e) => return Err(remote("deleting", &name, &resource_group, e)),
        }
        d.clear_id();
        Ok(())
    }
}
