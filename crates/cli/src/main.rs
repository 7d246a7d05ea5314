use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Map as JsonMap, Value as Json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

use azlogic_azure::{AzCliWorkflowsClient, AzureProvider, AzureResourceId, LogicAppWorkflowResource};
use azlogic_core::{LockTable, Resource, ResourceData};

#[derive(Parser, Debug)]
#[command(author, version, about="azlogic — Logic App workflow lifecycle against Azure Resource Manager")]
struct Cli {
    /// Stack file (YAML)
    #[arg(short, long, default_value="azlogic.yaml", global = true)]
    file: PathBuf,

    /// Resource id; derived from the stack file when omitted
    #[arg(long, global = true)]
    id: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    Create,
    Read,
    Update,
    Delete,
    /// Adopt an existing workflow by id
    Import,
    /// Print the attribute schema
    Schema,
}

/// Commands that drive the resource against the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle { Create, Read, Update, Delete, Import }

impl Cmd {
    fn lifecycle(&self) -> Option<Lifecycle> {
        match self {
            Cmd::Create => Some(Lifecycle::Create),
            Cmd::Read => Some(Lifecycle::Read),
            Cmd::Update => Some(Lifecycle::Update),
            Cmd::Delete => Some(Lifecycle::Delete),
            Cmd::Import => Some(Lifecycle::Import),
            Cmd::Schema => None,
        }
    }
}

#[derive(Deserialize, Debug)]
struct Stack {
    #[serde(default)]
    provider: Providers,
    #[serde(default)]
    workflow: JsonMap<String, Json>,
}

#[derive(Deserialize, Debug, Default)]
struct Providers {
    #[serde(default)]
    azurerm: AzureProvider,
}

fn load_stack(path: &Path) -> Result<Stack> {
    let raw = std::fs::read(path).with_context(|| format!("read stack file {}", path.display()))?;
    serde_yaml::from_slice(&raw).with_context(|| format!("parse stack file {}", path.display()))
}

fn derive_id(subscription_id: &str, workflow: &JsonMap<String, Json>) -> Result<String> {
    let field = |k: &str| workflow.get(k).and_then(Json::as_str)
        .with_context(|| format!("workflow.{k} is required to derive the resource id (or pass --id)"));
    Ok(AzureResourceId::workflow(subscription_id, field("resource_group_name")?, field("name")?).to_string())
}

fn schema_json(resource: &dyn Resource) -> Json {
    let attrs: JsonMap<String, Json> = resource.schema().attributes()
        .map(|(name, a)| (name.to_string(), json!({
            "type": format!("{:?}", a.ty),
            "required": a.required,
            "optional": a.optional,
            "computed": a.computed,
            "force_new": a.force_new,
            "default": a.default,
        })))
        .collect();
    json!({ "type": resource.type_name(), "attributes": attrs })
}

fn print_state(d: &ResourceData) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(d)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().json()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let Some(op) = cli.cmd.lifecycle() else {
        let client = Arc::new(AzCliWorkflowsClient::with_binary("az".into(), "", ""));
        let resource = LogicAppWorkflowResource::new(client, LockTable::new());
        println!("{}", serde_json::to_string_pretty(&schema_json(&resource))?);
        return Ok(());
    };

    let stack = load_stack(&cli.file)?;
    let subscription_id = stack.provider.azurerm.resolve_subscription_id()
        .context("no subscription id: set provider.azurerm.subscription_id or ARM_SUBSCRIPTION_ID")?;
    let client = AzCliWorkflowsClient::new(subscription_id.clone(), stack.provider.azurerm.endpoint())
        .context("'az' CLI not found in PATH. Install the Azure CLI and run 'az login'.")?;
    let resource = LogicAppWorkflowResource::new(Arc::new(client), LockTable::new());

    let id = match cli.id.clone() {
        Some(id) => Some(id),
        None if op == Lifecycle::Create => None,
        None => Some(derive_id(&subscription_id, &stack.workflow)?),
    };
    let mut d = ResourceData::new(stack.workflow);
    if let Some(id) = &id { d.set_id(id.clone()); }

    match op {
        Lifecycle::Create => resource.create(&mut d).await?,
        Lifecycle::Read => resource.read(&mut d).await?,
        Lifecycle::Update => resource.update(&mut d).await?,
        Lifecycle::Delete => resource.delete(&mut d).await?,
        Lifecycle::Import => {
            let id = id.context("import needs --id")?;
            d = resource.import(&id).await?;
        }
    }

    if d.id().is_none() {
        tracing::info!("workflow is absent");
    }
    print_state(&d)
}
