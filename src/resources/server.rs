//! Server bindings (`servers/{alias}/{id}`) and batch power operations.

use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::queue::Requests;
use crate::resources::{lookup_attr, str_field, Group};
use crate::sdk::{segment, ApiClient, Payload};

/// Minimum server time-to-live, in seconds (exclusive).
pub const MIN_TTL_SECONDS: i64 = 3600;

const INVALID_COMBO: &str = "Invalid type/storage_type combo";

/// Power and maintenance operations accepted by `operations/{alias}/servers/{op}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PowerOperation {
    Archive,
    Pause,
    ShutDown,
    Reboot,
    Reset,
    PowerOff,
    PowerOn,
    StartMaintenance,
    StopMaintenance,
}

impl PowerOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Pause => "pause",
            Self::ShutDown => "shutDown",
            Self::Reboot => "reboot",
            Self::Reset => "reset",
            Self::PowerOff => "powerOff",
            Self::PowerOn => "powerOn",
            Self::StartMaintenance => "startMaintenance",
            Self::StopMaintenance => "stopMaintenance",
        }
    }
}

impl std::fmt::Display for PowerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Standard,
    Hyperscale,
}

/// Storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Standard,
    Premium,
    Hyperscale,
}

impl FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            "hyperscale" => Ok(Self::Hyperscale),
            _ => Err(Error::clc(INVALID_COMBO)),
        }
    }
}

/// Storage type for a server type, checking the combination is allowed.
///
/// Standard servers take standard or premium storage, hyperscale servers
/// only hyperscale storage.
pub fn resolve_storage_type(
    server_type: ServerType,
    storage_type: Option<StorageType>,
) -> Result<StorageType> {
    match (server_type, storage_type) {
        (ServerType::Standard, None) => Ok(StorageType::Standard),
        (ServerType::Hyperscale, None) => Ok(StorageType::Hyperscale),
        (ServerType::Standard, Some(s @ (StorageType::Standard | StorageType::Premium))) => Ok(s),
        (ServerType::Hyperscale, Some(StorageType::Hyperscale)) => Ok(StorageType::Hyperscale),
        _ => Err(Error::clc(INVALID_COMBO)),
    }
}

/// Additional disk attached at creation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "sizeGB")]
    pub size_gb: u32,
    #[serde(rename = "type")]
    pub disk_type: String,
}

/// Custom field value attached at creation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomField {
    pub id: String,
    pub value: String,
}

/// Parameters for [`Server::create`].
#[derive(Debug, Clone, Default)]
pub struct ServerSpec {
    pub name: String,
    /// Template name or source server id
    pub template: String,
    pub group_id: String,
    pub network_id: String,
    pub alias: Option<String>,
    /// Defaults to the group's default when unset
    pub cpu: Option<u32>,
    /// Memory in GB; defaults to the group's default when unset
    pub memory: Option<u32>,
    pub description: Option<String>,
    pub password: Option<String>,
    pub server_type: ServerType,
    pub storage_type: Option<StorageType>,
    pub ip_address: Option<String>,
    pub primary_dns: Option<String>,
    pub secondary_dns: Option<String>,
    pub managed_os: bool,
    pub anti_affinity_policy_id: Option<String>,
    pub additional_disks: Vec<Disk>,
    pub custom_fields: Vec<CustomField>,
    /// Seconds until the server is deleted; must exceed one hour
    pub ttl: Option<i64>,
}

/// Body of `POST servers/{alias}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateServerRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    group_id: &'a str,
    source_server_id: &'a str,
    #[serde(rename = "isManagedOS")]
    is_managed_os: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_dns: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary_dns: Option<&'a str>,
    network_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    cpu: u32,
    #[serde(rename = "memoryGB")]
    memory_gb: u32,
    #[serde(rename = "type")]
    server_type: ServerType,
    storage_type: StorageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    anti_affinity_policy_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_fields: Vec<CustomField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    additional_disks: Vec<Disk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<String>,
}

/// Submit a power operation for a set of servers.
///
/// When the API rejects the whole call it still describes each server in a
/// batch body; that body is used instead of the error.
async fn batch_operation(
    client: &ApiClient,
    alias: &str,
    ids: &[String],
    operation: PowerOperation,
) -> Result<Requests> {
    let path = format!("operations/{}/servers/{}", segment(alias), operation.as_str());
    info!("Submitting {} for {} server(s)", operation, ids.len());

    let response = match client.post(&path, Payload::Json(json!(ids))).await {
        Ok(response) => response,
        Err(e) => {
            let body = e.response_json().filter(|b| b.is_array()).cloned();
            match body {
                Some(body) => body,
                None => return Err(e),
            }
        }
    };
    Requests::from_response(client.clone(), &response, Some(alias)).await
}

/// A server, mirroring the API's JSON document.
#[derive(Debug, Clone)]
pub struct Server {
    client: ApiClient,
    id: String,
    alias: String,
    data: Value,
}

impl Server {
    /// Fetch a server. 404 is reported as `"Server does not exist"`.
    pub async fn get(client: ApiClient, id: impl Into<String>, alias: Option<&str>) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let mut server = Self {
            client,
            id: id.into(),
            alias,
            data: Value::Null,
        };

        match server.refresh().await {
            Ok(()) => Ok(server),
            Err(e) if e.is_not_found() => Err(Error::clc("Server does not exist")),
            Err(e) => Err(e),
        }
    }

    /// Wrap an already known server document.
    pub fn from_data(
        client: ApiClient,
        id: impl Into<String>,
        alias: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            client,
            id: id.into(),
            alias: alias.into(),
            data,
        }
    }

    /// Validate `spec` and queue the creation of a server.
    ///
    /// # Errors
    ///
    /// Local validation failures carry fixed messages:
    /// `"Invalid type/storage_type combo"`,
    /// `"ttl must be greater than 3600 seconds"`, `"No default CPU defined"`
    /// and `"No default Memory defined"`.
    pub async fn create(client: ApiClient, spec: ServerSpec) -> Result<Requests> {
        let storage_type = resolve_storage_type(spec.server_type, spec.storage_type)?;

        let ttl = match spec.ttl {
            Some(seconds) if seconds <= MIN_TTL_SECONDS => {
                return Err(Error::clc("ttl must be greater than 3600 seconds"));
            }
            Some(seconds) => {
                let expires = Duration::try_seconds(seconds)
                    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                    .ok_or_else(|| Error::clc("ttl is out of range"))?;
                Some(expires.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            None => None,
        };

        let alias = client.resolve_alias(spec.alias.as_deref()).await?;

        let (cpu, memory) = match (spec.cpu, spec.memory) {
            (Some(cpu), Some(memory)) => (cpu, memory),
            (cpu, memory) => {
                let mut group = Group::get(client.clone(), &spec.group_id, Some(&alias)).await?;
                let cpu = match cpu {
                    Some(cpu) => cpu,
                    None => group_default(&mut group, "cpu")
                        .await?
                        .ok_or_else(|| Error::clc("No default CPU defined"))?,
                };
                let memory = match memory {
                    Some(memory) => memory,
                    None => group_default(&mut group, "memoryGB")
                        .await?
                        .ok_or_else(|| Error::clc("No default Memory defined"))?,
                };
                (cpu, memory)
            }
        };

        let request = CreateServerRequest {
            name: &spec.name,
            description: spec.description.as_deref(),
            group_id: &spec.group_id,
            source_server_id: &spec.template,
            is_managed_os: spec.managed_os,
            primary_dns: spec.primary_dns.as_deref(),
            secondary_dns: spec.secondary_dns.as_deref(),
            network_id: &spec.network_id,
            ip_address: spec.ip_address.as_deref(),
            password: spec.password.as_deref(),
            cpu,
            memory_gb: memory,
            server_type: spec.server_type,
            storage_type,
            anti_affinity_policy_id: spec.anti_affinity_policy_id.as_deref(),
            custom_fields: spec.custom_fields.clone(),
            additional_disks: spec.additional_disks.clone(),
            ttl,
        };
        debug!("Creating server {} in group {}", spec.name, spec.group_id);

        let response = client
            .post(
                &format!("servers/{}", segment(&alias)),
                Payload::Json(serde_json::to_value(&request)?),
            )
            .await?;
        Requests::from_response(client, &response, Some(&alias)).await
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn name(&self) -> &str {
        str_field(&self.data, "name").unwrap_or(&self.id)
    }

    pub fn description(&self) -> Option<&str> {
        str_field(&self.data, "description")
    }

    pub fn status(&self) -> Option<&str> {
        str_field(&self.data, "status")
    }

    pub fn group_id(&self) -> Option<&str> {
        str_field(&self.data, "groupId")
    }

    pub fn location_id(&self) -> Option<&str> {
        str_field(&self.data, "locationId")
    }

    pub fn power_state(&self) -> Option<&str> {
        self.data
            .get("details")
            .and_then(|d| d.get("powerState"))
            .and_then(Value::as_str)
    }

    pub fn cpu(&self) -> Option<u64> {
        self.data
            .get("details")
            .and_then(|d| d.get("cpu"))
            .and_then(Value::as_u64)
    }

    pub fn memory_mb(&self) -> Option<u64> {
        self.data
            .get("details")
            .and_then(|d| d.get("memoryMB"))
            .and_then(Value::as_u64)
    }

    /// Cached server document.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Resolve any other attribute from the cached document, including its
    /// `details` and `changeInfo` sections.
    pub fn get_attr(&self, name: &str) -> Result<&Value> {
        lookup_attr(&self.data, "Server", name)
    }

    fn path(&self) -> String {
        format!("servers/{}/{}", segment(&self.alias), segment(&self.id))
    }

    /// Reload the server document.
    pub async fn refresh(&mut self) -> Result<()> {
        self.data = self.client.get(&self.path()).await?;
        Ok(())
    }

    /// Queue a power or maintenance operation for this server.
    pub async fn operation(&self, operation: PowerOperation) -> Result<Requests> {
        batch_operation(&self.client, &self.alias, &[self.id.clone()], operation).await
    }

    pub async fn archive(&self) -> Result<Requests> {
        self.operation(PowerOperation::Archive).await
    }

    pub async fn pause(&self) -> Result<Requests> {
        self.operation(PowerOperation::Pause).await
    }

    pub async fn shut_down(&self) -> Result<Requests> {
        self.operation(PowerOperation::ShutDown).await
    }

    pub async fn reboot(&self) -> Result<Requests> {
        self.operation(PowerOperation::Reboot).await
    }

    pub async fn reset(&self) -> Result<Requests> {
        self.operation(PowerOperation::Reset).await
    }

    pub async fn power_off(&self) -> Result<Requests> {
        self.operation(PowerOperation::PowerOff).await
    }

    pub async fn power_on(&self) -> Result<Requests> {
        self.operation(PowerOperation::PowerOn).await
    }

    pub async fn start_maintenance(&self) -> Result<Requests> {
        self.operation(PowerOperation::StartMaintenance).await
    }

    pub async fn stop_maintenance(&self) -> Result<Requests> {
        self.operation(PowerOperation::StopMaintenance).await
    }

    /// Queue deletion of this server.
    pub async fn delete(&self) -> Result<Requests> {
        let response = self.client.delete(&self.path()).await?;
        Requests::from_response(self.client.clone(), &response, Some(&self.alias)).await
    }

    /// Attach a secondary NIC on `network_id`, optionally with a fixed IP.
    pub async fn add_nic(&self, network_id: &str, ip: Option<&str>) -> Result<Requests> {
        let payload = json!({"networkId": network_id, "ipAddress": ip.unwrap_or("")});
        let response = self
            .client
            .post(&format!("{}/networks", self.path()), Payload::Json(payload))
            .await?;
        Requests::from_response(self.client.clone(), &response, Some(&self.alias)).await
    }
}

async fn group_default(group: &mut Group, key: &str) -> Result<Option<u32>> {
    Ok(group
        .defaults(key)
        .await?
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok()))
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// A set of servers operated on as one batch.
#[derive(Debug, Clone)]
pub struct Servers {
    client: ApiClient,
    alias: String,
    ids: Vec<String>,
}

impl Servers {
    pub fn new(client: ApiClient, alias: impl Into<String>, ids: Vec<String>) -> Self {
        Self {
            client,
            alias: alias.into(),
            ids,
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Queue one operation covering every server in the set.
    pub async fn operation(&self, operation: PowerOperation) -> Result<Requests> {
        batch_operation(&self.client, &self.alias, &self.ids, operation).await
    }

    /// Fetch every server in the set.
    pub async fn servers(&self) -> Result<Vec<Server>> {
        let mut servers = Vec::with_capacity(self.ids.len());
        for id in &self.ids {
            servers.push(Server::get(self.client.clone(), id, Some(&self.alias)).await?);
        }
        Ok(servers)
    }
}
