//! In-process stand-in for the Logic workflows API. It keeps workflows in a
//! map, records every call in order and can be told to fail.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::id::AzureResourceId;
use crate::logic::{RemoteError, Workflow, WorkflowProperties, WorkflowsClient, RESOURCE_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind { CreateOrUpdate, Get, Delete }

/// One remote call. `finished` is false for the entry logged when the call
/// starts and true for the one logged when it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub resource_group: String,
    pub name: String,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct State {
    workflows: BTreeMap<(String, String), Workflow>,
    calls: Vec<RecordedCall>,
    failures: VecDeque<(CallKind, RemoteError)>,
}

#[derive(Debug)]
pub struct MemoryWorkflowsClient {
    subscription_id: String,
    latency: Option<Duration>,
    omit_ids: bool,
    state: Mutex<State>,
}

impl Default for MemoryWorkflowsClient {
    fn default() -> Self { Self::new("00000000-0000-0000-0000-000000000000") }
}

impl MemoryWorkflowsClient {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self { subscription_id: subscription_id.into(), latency: None, omit_ids: false, state: Mutex::new(State::default()) }
    }

    /// Every call sleeps this long between being logged and taking effect.
    pub fn with_latency(mut self, latency: Duration) -> Self { self.latency = Some(latency); self }

    /// Responses come back without an `id`.
    pub fn without_ids(mut self) -> Self { self.omit_ids = true; self }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The next call of `kind` fails with `err` instead of running.
    pub fn fail_next(&self, kind: CallKind, err: RemoteError) {
        self.state().failures.push_back((kind, err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> { self.state().calls.clone() }

    pub fn workflow(&self, resource_group: &str, name: &str) -> Option<Workflow> {
        self.state().workflows.get(&(resource_group.to_string(), name.to_string())).cloned()
    }

    /// Edit a stored workflow in place, the way a sibling resource would.
    pub fn modify<F: FnOnce(&mut Workflow)>(&self, resource_group: &str, name: &str, f: F) -> bool {
        let mut st = self.state();
        match st.workflows.get_mut(&(resource_group.to_string(), name.to_string())) {
            Some(wf) => { f(wf); true }
            None => false,
        }
    }

    fn record(&self, kind: CallKind, resource_group: &str, name: &str, finished: bool) {
        self.state().calls.push(RecordedCall {
            kind,
            resource_group: resource_group.to_string(),
            name: name.to_string(),
            finished,
        });
    }

    async fn begin(&self, kind: CallKind, resource_group: &str, name: &str) -> Result<(), RemoteError> {
        self.record(kind, resource_group, name, false);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failure = {
            let mut st = self.state();
            let pos = st.failures.iter().position(|(k, _)| *k == kind);
            pos.and_then(|pos| st.failures.remove(pos))
        };
        if let Some((_, err)) = failure {
            self.record(kind, resource_group, name, true);
            return Err(err);
        }
        Ok(())
    }

    fn respond(&self, mut wf: Workflow) -> Workflow {
        if self.omit_ids { wf.id = None; }
        wf
    }
}

#[async_trait]
impl WorkflowsClient for MemoryWorkflowsClient {
    async fn create_or_update(&self, resource_group: &str, name: &str, mut workflow: Workflow) -> Result<Workflow, RemoteError> {
        self.begin(CallKind::CreateOrUpdate, resource_group, name).await?;
        workflow.id = Some(AzureResourceId::workflow(&self.subscription_id, resource_group, name).to_string());
        workflow.name = Some(name.to_string());
        workflow.type_name = Some(RESOURCE_TYPE.to_string());
        let location = workflow.location.clone().unwrap_or_default();
        let props = workflow.properties.get_or_insert_with(WorkflowProperties::default);
        props.provisioning_state = Some("Succeeded".to_string());
        props.state = Some("Enabled".to_string());
        props.access_endpoint = Some(format!("https://{location}.logic.azure.com:443/workflows/{name}"));
        self.state().workflows.insert((resource_group.to_string(), name.to_string()), workflow.clone());
        self.record(CallKind::CreateOrUpdate, resource_group, name, true);
        Ok(self.respond(workflow))
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<Workflow, RemoteError> {
        self.begin(CallKind::Get, resource_group, name).await?;
        let found = self.workflow(resource_group, name);
        self.record(CallKind::Get, resource_group, name, true);
        match found {
            Some(wf) => Ok(self.respond(wf)),
            None => Err(RemoteError::not_found(format!("workflow {name:?} not found in resource group {resource_group:?}"))),
        }
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<(), RemoteError> {
        self.begin(CallKind::Delete, resource_group, name).await?;
        let removed = self.state().workflows.remove(&(resource_group.to_string(), name.to_string()));
        self.record(CallKind::Delete, resource_group, name, true);
        match removed {
            Some(_) => Ok(()),
            None => Err(RemoteError::not_found(format!("workflow {name:?} not found in resource group {resource_group:?}"))),
        }
    }
}
