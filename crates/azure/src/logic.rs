//! Microsoft.Logic management model (api-version 2016-06-01) and the remote
//! client seam the workflow resource talks through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};
use std::collections::BTreeMap;
use thiserror::Error;

pub const API_VERSION: &str = "2016-06-01";
pub const RESOURCE_TYPE: &str = "Microsoft.Logic/workflows";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<WorkflowProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Definition>,
    /// Entries may be `null` on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, Option<WorkflowParameter>>>,
}

/// The workflow definition document. Keys this crate does not model are kept
/// in `extra` so a round trip through update leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<JsonMap<String, Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<JsonMap<String, Json>>,
    #[serde(flatten)]
    pub extra: JsonMap<String, Json>,
}

impl Definition {
    /// A definition with no actions and no triggers.
    pub fn empty(schema: &str, content_version: &str) -> Self {
        Self {
            schema: Some(schema.to_string()),
            content_version: Some(content_version.to_string()),
            actions: Some(JsonMap::new()),
            triggers: Some(JsonMap::new()),
            extra: JsonMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    NotSpecified,
    String,
    SecureString,
    Int,
    Float,
    Bool,
    Array,
    Object,
    SecureObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowParameter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<ParameterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed ({}): {message}", .status.map_or_else(|| "no status".to_string(), |s| s.to_string()))]
    Response {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    #[error("transport: {0}")]
    Transport(String),
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

impl RemoteError {
    pub fn was_not_found(&self) -> bool {
        match self {
            RemoteError::Response { status: Some(404), .. } => true,
            RemoteError::Response { code: Some(code), .. } => {
                matches!(code.as_str(), "ResourceNotFound" | "ResourceGroupNotFound" | "WorkflowNotFound")
            }
            _ => false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        RemoteError::Response { status: Some(404), code: Some("ResourceNotFound".into()), message: message.into() }
    }
}

#[async_trait]
pub trait WorkflowsClient: Send + Sync {
    async fn create_or_update(&self, resource_group: &str, name: &str, workflow: Workflow) -> Result<Workflow, RemoteError>;
    async fn get(&self, resource_group: &str, name: &str) -> Result<Workflow, RemoteError>;
    async fn delete(&self, resource_group: &str, name: &str) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_keeps_unknown_keys() {
        let raw = json!({
            "$schema": "https://example/schema#",
            "contentVersion": "1.0.0.0",
            "actions": { "a1": { "type": "Http" } },
            "triggers": {},
            "outputs": { "o": 1 }
        });
        let def: Definition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(def.schema.as_deref(), Some("https://example/schema#"));
        assert_eq!(def.content_version.as_deref(), Some("1.0.0.0"));
        assert!(def.extra.contains_key("outputs"));
        assert_eq!(serde_json::to_value(&def).unwrap(), raw);
    }

    #[test]
    fn empty_definition_wire_shape() {
        let def = Definition::empty("s", "1.0.0.0");
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({ "$schema": "s", "contentVersion": "1.0.0.0", "actions": {}, "triggers": {} })
        );
    }

    #[test]
    fn workflow_wire_shape() {
        let wf: Workflow = serde_json::from_value(json!({
            "id": "/x",
            "name": "wf1",
            "type": "Microsoft.Logic/workflows",
            "location": "westus",
            "properties": {
                "accessEndpoint": "https://e",
                "parameters": { "p1": { "type": "String", "value": "v1" } }
            }
        })).unwrap();
        let props = wf.properties.unwrap();
        assert_eq!(props.access_endpoint.as_deref(), Some("https://e"));
        let params = props.parameters.unwrap();
        let p1 = params["p1"].as_ref().unwrap();
        assert_eq!(p1.ty, Some(ParameterType::String));
        assert_eq!(p1.value, Some(json!("v1")));
        assert!(wf.tags.is_none());
    }

    #[test]
    fn null_parameter_entries_decode() {
        let wf: Workflow = serde_json::from_value(json!({
            "properties": {
                "parameters": {
                    "p1": { "type": "String", "value": "v1" },
                    "p2": null
                }
            }
        })).unwrap();
        let params = wf.properties.unwrap().parameters.unwrap();
        assert_eq!(params.len(), 2);
        assert!(params["p1"].is_some());
        assert!(params["p2"].is_none());
    }

    #[test]
    fn not_found_classification() {
        assert!(RemoteError::not_found("gone").was_not_found());
        assert!(RemoteError::Response { status: None, code: Some("ResourceGroupNotFound".into()), message: String::new() }.was_not_found());
        assert!(!RemoteError::Response { status: Some(409), code: Some("Conflict".into()), message: String::new() }.was_not_found());
        assert!(!RemoteError::Transport("io".into()).was_not_found());
        assert!(!RemoteError::MissingField("id").was_not_found());
    }
}
