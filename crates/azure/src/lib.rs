use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

mod id;
pub mod az_cli;
pub mod logic;
pub mod memory;
pub mod workflow;

pub use id::AzureResourceId;
pub use az_cli::AzCliWorkflowsClient;
pub use logic::{Definition, ParameterType, RemoteError, Workflow, WorkflowParameter, WorkflowProperties, WorkflowsClient};
pub use memory::MemoryWorkflowsClient;
pub use workflow::{expand_parameters, flatten_parameters, LogicAppWorkflowResource};

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// `provider.azurerm` block of a stack file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureProvider {
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AzureProvider {
    /// Falls back to `ARM_SUBSCRIPTION_ID` the way the azurerm provider does.
    pub fn resolve_subscription_id(&self) -> Option<String> {
        self.subscription_id.clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("ARM_SUBSCRIPTION_ID").ok().filter(|s| !s.is_empty()))
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

/// Azure accepts "West US", "westus" and "WestUS" for the same region.
pub fn normalize_location(location: &str) -> String {
    location.to_lowercase().replace(' ', "")
}

pub fn expand_tags(tags: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    tags.clone()
}

pub fn flatten_tags(tags: Option<&BTreeMap<String, String>>) -> BTreeMap<String, String> {
    tags.cloned().unwrap_or_default()
}
