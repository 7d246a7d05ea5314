//! Workflows client that drives `az rest`, so authentication and transport
//! stay with the Azure CLI.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::logic::{RemoteError, Workflow, WorkflowsClient, API_VERSION};

#[derive(Debug, Clone)]
pub struct AzCliWorkflowsClient {
    az: PathBuf,
    subscription_id: String,
    endpoint: String,
}

impl AzCliWorkflowsClient {
    pub fn new(subscription_id: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, RemoteError> {
        let az = which::which("az")
            .map_err(|e| RemoteError::Transport(format!("az cli not found in PATH: {e}")))?;
        Ok(Self::with_binary(az, subscription_id, endpoint))
    }

    pub fn with_binary(az: PathBuf, subscription_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            az,
            subscription_id: subscription_id.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Logic/workflows/{}?api-version={}",
            self.endpoint, self.subscription_id, resource_group, name, API_VERSION
        )
    }

    async fn rest(&self, method: &str, url: &str, body: Option<String>) -> Result<String, RemoteError> {
        let mut cmd = Command::new(&self.az);
        cmd.arg("rest")
            .arg("--method").arg(method)
            .arg("--url").arg(url)
            .arg("--output").arg("json");
        if let Some(b) = body {
            cmd.arg("--headers").arg("Content-Type=application/json")
                .arg("--body").arg(b);
        }
        tracing::debug!(method, url, "az rest");
        let out = cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RemoteError::Transport(format!("spawn az rest: {e}")))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(classify_failure(&stderr));
        }
        String::from_utf8(out.stdout)
            .map_err(|e| RemoteError::Transport(format!("az rest produced non-utf8 output: {e}")))
    }
}

#[derive(Deserialize)]
struct ArmErrorEnvelope { error: ArmError }
#[derive(Deserialize)]
struct ArmError { code: Option<String>, message: Option<String> }

fn status_for_reason(reason: &str) -> Option<u16> {
    Some(match reason {
        "Bad Request" => 400,
        "Unauthorized" => 401,
        "Forbidden" => 403,
        "Not Found" => 404,
        "Conflict" => 409,
        "Precondition Failed" => 412,
        "Too Many Requests" => 429,
        "Internal Server Error" => 500,
        "Bad Gateway" => 502,
        "Service Unavailable" => 503,
        "Gateway Timeout" => 504,
        _ => return None,
    })
}

/// `az rest` reports HTTP failures on stderr as
/// `ERROR: <Reason Phrase>({"error":{"code":..,"message":..}})`.
pub(crate) fn classify_failure(stderr: &str) -> RemoteError {
    let line = stderr.lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .unwrap_or_else(|| stderr.trim());
    let rest = line.trim_start_matches("ERROR:").trim();

    let (reason, payload) = match (rest.find('('), rest.rfind(')')) {
        (Some(open), Some(close)) if close > open => (rest[..open].trim(), Some(&rest[open + 1..close])),
        _ => (rest, None),
    };
    let arm = payload.and_then(|p| serde_json::from_str::<ArmErrorEnvelope>(p).ok()).map(|e| e.error);

    let status = status_for_reason(reason);
    if status.is_none() && arm.is_none() {
        return RemoteError::Transport(rest.to_string());
    }
    let (code, message) = match arm {
        Some(e) => (e.code, e.message.unwrap_or_else(|| reason.to_string())),
        None => (None, reason.to_string()),
    };
    RemoteError::Response { status, code, message }
}

#[async_trait]
impl WorkflowsClient for AzCliWorkflowsClient {
    async fn create_or_update(&self, resource_group: &str, name: &str, workflow: Workflow) -> Result<Workflow, RemoteError> {
        let body = serde_json::to_string(&workflow)?;
        let out = self.rest("put", &self.url(resource_group, name), Some(body)).await?;
        Ok(serde_json::from_str(&out)?)
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<Workflow, RemoteError> {
        let out = self.rest("get", &self.url(resource_group, name), None).await?;
        Ok(serde_json::from_str(&out)?)
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<(), RemoteError> {
        self.rest("delete", &self.url(resource_group, name), None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_arm_url() {
        let c = AzCliWorkflowsClient::with_binary("az".into(), "sub", "https://management.azure.com/");
        assert_eq!(
            c.url("rg1", "wf1"),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Logic/workflows/wf1?api-version=2016-06-01"
        );
    }

    #[test]
    fn not_found_from_stderr() {
        let err = classify_failure(
            "ERROR: Not Found({\"error\":{\"code\":\"ResourceNotFound\",\"message\":\"The Resource 'Microsoft.Logic/workflows/wf1' under resource group 'rg1' was not found.\"}})\n",
        );
        assert!(err.was_not_found());
        match err {
            RemoteError::Response { status, code, message } => {
                assert_eq!(status, Some(404));
                assert_eq!(code.as_deref(), Some("ResourceNotFound"));
                assert!(message.contains("was not found"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_http_failures_are_not_not_found() {
        let err = classify_failure("ERROR: Conflict({\"error\":{\"code\":\"WorkflowBusy\",\"message\":\"busy\"}})");
        assert!(!err.was_not_found());
        assert!(matches!(err, RemoteError::Response { status: Some(409), .. }));
    }

    #[test]
    fn unrecognised_output_is_transport() {
        let err = classify_failure("Please run 'az login' to setup account.");
        assert!(matches!(err, RemoteError::Transport(m) if m.contains("az login")));
    }
}
