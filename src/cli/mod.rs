//! Subcommands of the `clc` binary.
//!
//! Each subcommand maps onto one resource binding call. Results are
//! printed as JSON or YAML; batch operations optionally wait for their
//! queued requests and report a summary.

use clap::Subcommand;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::config::{Config, OutputFormat};
use crate::error::{Error, Result};
use crate::queue::{Request, RequestContext, Requests};
use crate::resources::{
    Datacenter, Group, HorizontalAutoscalePolicy, Network, Networks, PowerOperation, Server,
    ServerSpec, ServerType, Servers, StorageType,
};
use crate::sdk::ApiClient;

/// Top-level commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and show the account and default location
    Login,
    /// Datacenters
    Datacenter {
        #[command(subcommand)]
        command: DatacenterCommand,
    },
    /// Networks
    Network {
        #[command(subcommand)]
        command: NetworkCommand,
    },
    /// Servers
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },
    /// Server groups
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Horizontal autoscale policies
    Autoscale {
        #[command(subcommand)]
        command: AutoscaleCommand,
    },
    /// Queued operations
    Operation {
        #[command(subcommand)]
        command: OperationCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DatacenterCommand {
    /// List datacenters available to the account
    List,
    /// Show a datacenter
    Get { location: Option<String> },
    /// Show deployment capabilities
    Capabilities { location: Option<String> },
    /// List networks in a datacenter
    Networks {
        location: Option<String>,
        /// Fetch the full network list instead of the deployable networks
        #[arg(long)]
        forced_load: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum NetworkCommand {
    /// List networks in a location
    List,
    /// Show a network
    Get { id: String },
    /// Claim a new network
    Claim {
        #[arg(long)]
        wait: bool,
    },
    /// Release a network
    Release { id: String },
    /// Rename a network
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ServerCommand {
    /// Show a server
    Get { id: String },
    /// Run a power or maintenance operation on one or more servers
    Op {
        #[arg(value_enum)]
        operation: PowerOperation,
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        wait: bool,
    },
    /// Delete a server
    Delete {
        id: String,
        #[arg(long)]
        wait: bool,
    },
    /// Add a secondary network interface
    AddNic {
        id: String,
        #[arg(long)]
        network: String,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        wait: bool,
    },
    /// Create a server
    Create(CreateServerArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateServerArgs {
    #[arg(long)]
    pub name: String,
    /// Template name or source server id
    #[arg(long)]
    pub template: String,
    #[arg(long)]
    pub group: String,
    #[arg(long)]
    pub network: String,
    #[arg(long)]
    pub cpu: Option<u32>,
    /// Memory in GB
    #[arg(long)]
    pub memory: Option<u32>,
    #[arg(long = "type", value_enum, default_value = "standard")]
    pub server_type: ServerType,
    /// standard, premium or hyperscale
    #[arg(long)]
    pub storage_type: Option<String>,
    /// Seconds until the server is deleted
    #[arg(long)]
    pub ttl: Option<i64>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub ip: Option<String>,
    #[arg(long)]
    pub wait: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GroupCommand {
    /// Show a group
    Get { id: String },
    /// Show the group's cpu and memory defaults
    Defaults { id: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AutoscaleCommand {
    /// List policies
    List,
    /// Show a policy
    Get { id: String },
    /// Create a policy from a JSON file
    Create { file: PathBuf },
    /// Replace a policy from a JSON file
    Update { id: String, file: PathBuf },
    /// Delete a policy
    Delete { id: String },
    /// Apply a policy to a group
    Apply {
        id: String,
        #[arg(long)]
        group: String,
    },
    /// Remove the policy applied to a group
    Remove {
        #[arg(long)]
        group: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum OperationCommand {
    /// Show the current status of an operation
    Status { id: String },
    /// Wait for an operation to complete
    Wait { id: String },
}

/// Result of a command: the document to print and whether it failed.
#[derive(Debug)]
struct Reply {
    body: Value,
    failed: bool,
}

impl From<Value> for Reply {
    fn from(body: Value) -> Self {
        Self {
            body,
            failed: false,
        }
    }
}

/// Render a document in the configured format.
pub fn render(format: OutputFormat, value: &Value) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}

/// Run a command and print its result.
///
/// Exits with failure when a waited-for batch had failed requests.
pub async fn run(client: &ApiClient, config: &Config, command: Command) -> Result<ExitCode> {
    let reply = execute(client, config, command).await?;
    let rendered = render(config.output, &reply.body)?;
    println!("{}", rendered.trim_end());

    Ok(if reply.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn execute(client: &ApiClient, config: &Config, command: Command) -> Result<Reply> {
    match command {
        Command::Login => {
            let session = client.login().await?;
            Ok(json!({
                "accountAlias": session.account_alias,
                "locationAlias": session.location_alias,
            })
            .into())
        }
        Command::Datacenter { command } => datacenter(client, command).await,
        Command::Network { command } => network(client, config, command).await,
        Command::Server { command } => server(client, config, command).await,
        Command::Group { command } => group(client, command).await,
        Command::Autoscale { command } => autoscale(client, command).await,
        Command::Operation { command } => operation(client, config, command).await,
    }
}

fn datacenter_json(dc: &Datacenter) -> Value {
    json!({
        "id": dc.id(),
        "name": dc.name(),
        "alias": dc.alias(),
        "rootGroupId": dc.root_group_id(),
        "rootGroupName": dc.root_group_name(),
    })
}

fn networks_json(networks: &Networks) -> Value {
    Value::Array(networks.networks().iter().map(|n| n.data().clone()).collect())
}

async fn datacenter(client: &ApiClient, command: DatacenterCommand) -> Result<Reply> {
    match command {
        DatacenterCommand::List => {
            let datacenters = Datacenter::list(client.clone(), None).await?;
            Ok(Value::Array(datacenters.iter().map(datacenter_json).collect()).into())
        }
        DatacenterCommand::Get { location } => {
            let dc = Datacenter::get(client.clone(), location.as_deref(), None).await?;
            Ok(datacenter_json(&dc).into())
        }
        DatacenterCommand::Capabilities { location } => {
            let mut dc = Datacenter::get(client.clone(), location.as_deref(), None).await?;
            Ok(dc.deployment_capabilities(true).await?.clone().into())
        }
        DatacenterCommand::Networks {
            location,
            forced_load,
        } => {
            let mut dc = Datacenter::get(client.clone(), location.as_deref(), None).await?;
            let networks = dc.networks(forced_load).await?;
            Ok(networks_json(&networks).into())
        }
    }
}

async fn network(client: &ApiClient, config: &Config, command: NetworkCommand) -> Result<Reply> {
    match command {
        NetworkCommand::List => {
            let location = client.location().await?;
            let networks = Networks::load(client.clone(), None, &location).await?;
            Ok(networks_json(&networks).into())
        }
        NetworkCommand::Get { id } => {
            let network = Network::get(client.clone(), id, None, None).await?;
            Ok(network.data().clone().into())
        }
        NetworkCommand::Claim { wait } => {
            let requests = Network::create(client.clone(), None, None).await?;
            finish(requests, wait, config).await
        }
        NetworkCommand::Release { id } => {
            let network = Network::from_data(client.clone(), id, client.alias().await?, Value::Null);
            Ok(network.delete(None).await?.into())
        }
        NetworkCommand::Update {
            id,
            name,
            description,
        } => {
            let mut network = Network::get(client.clone(), id, None, None).await?;
            network.update(&name, description.as_deref(), None).await?;
            Ok(network.data().clone().into())
        }
    }
}

async fn server(client: &ApiClient, config: &Config, command: ServerCommand) -> Result<Reply> {
    match command {
        ServerCommand::Get { id } => {
            let server = Server::get(client.clone(), id, None).await?;
            Ok(server.data().clone().into())
        }
        ServerCommand::Op {
            operation,
            ids,
            wait,
        } => {
            let servers = Servers::new(client.clone(), client.alias().await?, ids);
            let requests = servers.operation(operation).await?;
            finish(requests, wait, config).await
        }
        ServerCommand::Delete { id, wait } => {
            let server = Server::from_data(client.clone(), id, client.alias().await?, Value::Null);
            let requests = server.delete().await?;
            finish(requests, wait, config).await
        }
        ServerCommand::AddNic {
            id,
            network,
            ip,
            wait,
        } => {
            let server = Server::from_data(client.clone(), id, client.alias().await?, Value::Null);
            let requests = server.add_nic(&network, ip.as_deref()).await?;
            finish(requests, wait, config).await
        }
        ServerCommand::Create(args) => {
            let wait = args.wait;
            let spec = server_spec(args, config)?;
            info!("Creating server {}", spec.name);
            let requests = Server::create(client.clone(), spec).await?;
            finish(requests, wait, config).await
        }
    }
}

fn server_spec(args: CreateServerArgs, config: &Config) -> Result<ServerSpec> {
    let storage_type = args
        .storage_type
        .as_deref()
        .map(str::parse::<StorageType>)
        .transpose()?;

    Ok(ServerSpec {
        name: args.name,
        template: args.template,
        group_id: args.group,
        network_id: args.network,
        alias: config.alias.clone(),
        cpu: args.cpu,
        memory: args.memory,
        description: args.description,
        password: args.password,
        server_type: args.server_type,
        storage_type,
        ip_address: args.ip,
        ttl: args.ttl,
        ..ServerSpec::default()
    })
}

async fn group(client: &ApiClient, command: GroupCommand) -> Result<Reply> {
    match command {
        GroupCommand::Get { id } => {
            let group = Group::get(client.clone(), id, None).await?;
            Ok(group.data().clone().into())
        }
        GroupCommand::Defaults { id } => {
            let mut group = Group::get(client.clone(), id, None).await?;
            let cpu = group.defaults("cpu").await?;
            let memory = group.defaults("memoryGB").await?;
            Ok(json!({"cpu": cpu, "memoryGB": memory}).into())
        }
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path).await?;
    debug!("Read {} bytes from {}", content.len(), path.display());
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid JSON in {}: {}", path.display(), e)))
}

async fn autoscale(client: &ApiClient, command: AutoscaleCommand) -> Result<Reply> {
    match command {
        AutoscaleCommand::List => {
            let policies = HorizontalAutoscalePolicy::get_all(client.clone(), None).await?;
            Ok(Value::Array(policies.iter().map(|p| p.data().clone()).collect()).into())
        }
        AutoscaleCommand::Get { id } => {
            let policy = HorizontalAutoscalePolicy::get(client.clone(), id, None).await?;
            Ok(policy.data().clone().into())
        }
        AutoscaleCommand::Create { file } => {
            let body = read_json(&file).await?;
            let policy = HorizontalAutoscalePolicy::create(client.clone(), body, None).await?;
            Ok(policy.data().clone().into())
        }
        AutoscaleCommand::Update { id, file } => {
            let body = read_json(&file).await?;
            let mut policy = HorizontalAutoscalePolicy::get(client.clone(), id, None).await?;
            policy.update(body).await?;
            Ok(policy.data().clone().into())
        }
        AutoscaleCommand::Delete { id } => {
            let mut policy = HorizontalAutoscalePolicy::from_data(
                client.clone(),
                id,
                client.alias().await?,
                Value::Null,
            );
            Ok(policy.delete().await?.into())
        }
        AutoscaleCommand::Apply { id, group } => {
            let policy = HorizontalAutoscalePolicy::get(client.clone(), id, None).await?;
            Ok(policy.apply_to_group(&group).await?.into())
        }
        AutoscaleCommand::Remove { group } => {
            Ok(HorizontalAutoscalePolicy::remove_from_group(client.clone(), &group, None)
                .await?
                .into())
        }
    }
}

async fn operation(
    client: &ApiClient,
    config: &Config,
    command: OperationCommand,
) -> Result<Reply> {
    match command {
        OperationCommand::Status { id } => {
            let mut request = operation_request(client, id).await?;
            let status = request.status(false).await?;
            Ok(json!({"id": request.id(), "status": status}).into())
        }
        OperationCommand::Wait { id } => {
            let request = operation_request(client, id).await?;
            let requests = Requests::new(request.alias().to_string(), vec![request]);
            finish(requests, true, config).await
        }
    }
}

async fn operation_request(client: &ApiClient, id: String) -> Result<Request> {
    let alias = client.alias().await?;
    let context = RequestContext::Operation(id.clone());
    Ok(Request::new(client.clone(), id, alias, context))
}

fn request_json(request: &Request) -> Value {
    json!({
        "id": request.id(),
        "context": request.context().kind(),
        "value": request.context().value(),
    })
}

/// Print queued requests, or wait for them and summarise.
async fn finish(mut requests: Requests, wait: bool, config: &Config) -> Result<Reply> {
    if !wait {
        return Ok(Value::Array(requests.requests().iter().map(request_json).collect()).into());
    }

    let total = requests.len();
    let failed = requests.wait_until_complete(config.poll_interval()).await?;
    Ok(Reply {
        body: json!({
            "requests": total,
            "succeeded": total - failed,
            "failed": failed,
        }),
        failed: failed > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::testing::mount_statuses;
    use crate::test_support::mock_api;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn config() -> Config {
        Config {
            poll_interval: 0,
            ..Config::default()
        }
    }

    #[test]
    fn test_render_formats() {
        let value = json!({"requests": 2, "failed": 0});

        let json = render(OutputFormat::Json, &value).unwrap();
        assert!(json.contains("\"requests\": 2"));

        let yaml = render(OutputFormat::Yaml, &value).unwrap();
        assert!(yaml.contains("requests: 2"));
        assert!(yaml.contains("failed: 0"));
    }

    #[test]
    fn test_server_spec_rejects_unknown_storage() {
        let args = CreateServerArgs {
            name: "web".to_string(),
            template: "CENTOS-7-64-TEMPLATE".to_string(),
            group: "g1".to_string(),
            network: "n1".to_string(),
            cpu: None,
            memory: None,
            server_type: ServerType::Standard,
            storage_type: Some("kaboom".to_string()),
            ttl: None,
            password: None,
            description: None,
            ip: None,
            wait: false,
        };

        let err = server_spec(args, &config()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid type/storage_type combo");
    }

    #[tokio::test]
    async fn test_server_op_wait_reports_failure() {
        let (server, client) = mock_api().await;
        Mock::given(method("POST"))
            .and(path("/v2/operations/ALIAS/servers/reboot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"server": "S1", "isQueued": true, "links": [{"rel": "status", "href": "/x", "id": "op-1"}]},
                {"server": "S2", "isQueued": true, "links": [{"rel": "status", "href": "/x", "id": "op-2"}]}
            ])))
            .mount(&server)
            .await;
        mount_statuses(&server, "op-1", &["executing", "succeeded"]).await;
        mount_statuses(&server, "op-2", &["failed"]).await;

        let reply = execute(
            &client,
            &config(),
            Command::Server {
                command: ServerCommand::Op {
                    operation: PowerOperation::Reboot,
                    ids: vec!["S1".to_string(), "S2".to_string()],
                    wait: true,
                },
            },
        )
        .await
        .unwrap();

        assert!(reply.failed);
        assert_eq!(reply.body, json!({"requests": 2, "succeeded": 1, "failed": 1}));
    }

    #[tokio::test]
    async fn test_operation_status() {
        let (server, client) = mock_api().await;
        mount_statuses(&server, "op-9", &["executing"]).await;

        let reply = execute(
            &client,
            &config(),
            Command::Operation {
                command: OperationCommand::Status {
                    id: "op-9".to_string(),
                },
            },
        )
        .await
        .unwrap();

        assert!(!reply.failed);
        assert_eq!(reply.body, json!({"id": "op-9", "status": "executing"}));
    }

    #[tokio::test]
    async fn test_autoscale_create_from_file() {
        let (server, client) = mock_api().await;
        Mock::given(method("POST"))
            .and(path("/v2/horizontalAutoscalePolicies/ALIAS"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "p1", "name": "Web"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("policy.json");
        std::fs::write(&file, r#"{"name": "Web"}"#).unwrap();

        let reply = execute(
            &client,
            &config(),
            Command::Autoscale {
                command: AutoscaleCommand::Create { file },
            },
        )
        .await
        .unwrap();

        assert_eq!(reply.body["id"], "p1");
    }

    #[tokio::test]
    async fn test_login_hides_token() {
        let (_server, client) = mock_api().await;

        let reply = execute(&client, &config(), Command::Login).await.unwrap();

        assert_eq!(reply.body, json!({"accountAlias": "ALIAS", "locationAlias": "WA1"}));
    }
}
