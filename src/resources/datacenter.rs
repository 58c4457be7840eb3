//! Datacenter bindings (`datacenters/{alias}/{location}`).

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resources::{api_key, str_field, Group, Networks, Templates};
use crate::sdk::{segment, ApiClient, Payload};

/// Attributes resolved through the deployment capabilities document.
const CAPABILITY_ATTRS: [&str; 2] = ["supportsPremiumStorage", "supportsSharedLoadBalancer"];

fn loaded<'a>(slot: &'a Option<Value>, what: &str) -> Result<&'a Value> {
    slot.as_ref()
        .ok_or_else(|| Error::Internal(format!("{} not loaded", what)))
}

/// A datacenter available to an account.
#[derive(Debug, Clone)]
pub struct Datacenter {
    client: ApiClient,
    alias: String,
    location: String,
    name: String,
    root_group_id: String,
    root_group_name: String,
    deployment_capabilities: Option<Value>,
    baremetal_capabilities: Option<Value>,
}

impl Datacenter {
    /// All datacenters available to `alias`.
    pub async fn list(client: ApiClient, alias: Option<&str>) -> Result<Vec<Datacenter>> {
        let alias = client.resolve_alias(alias).await?;
        let response = client.get(&format!("datacenters/{}", segment(&alias))).await?;

        let mut datacenters = Vec::new();
        for entry in response.as_array().map(|a| a.as_slice()).unwrap_or_default() {
            if let Some(location) = str_field(entry, "id") {
                datacenters.push(Self::get(client.clone(), Some(location), Some(&alias)).await?);
            }
        }
        Ok(datacenters)
    }

    /// Fetch a datacenter with its root group link.
    ///
    /// Alias and location default to the logged-in account's.
    pub async fn get(client: ApiClient, location: Option<&str>, alias: Option<&str>) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let location = client.resolve_location(location).await?;

        let path = format!("datacenters/{}/{}", segment(&alias), segment(&location));
        let response = client
            .call(
                reqwest::Method::GET,
                &path,
                Payload::params([("GroupLinks", "true")]),
            )
            .await?;

        let group = response
            .get("links")
            .and_then(Value::as_array)
            .and_then(|links| {
                links
                    .iter()
                    .find(|l| str_field(l, "rel") == Some("group"))
            })
            .ok_or_else(|| Error::clc(format!("Datacenter {} has no root group", location)))?;

        Ok(Self {
            name: str_field(&response, "name").unwrap_or_default().to_string(),
            root_group_id: str_field(group, "id").unwrap_or_default().to_string(),
            root_group_name: str_field(group, "name").unwrap_or_default().to_string(),
            client,
            alias,
            location,
            deployment_capabilities: None,
            baremetal_capabilities: None,
        })
    }

    /// Datacenter id, which is its location.
    pub fn id(&self) -> &str {
        &self.location
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_group_id(&self) -> &str {
        &self.root_group_id
    }

    pub fn root_group_name(&self) -> &str {
        &self.root_group_name
    }

    fn path(&self) -> String {
        format!(
            "datacenters/{}/{}",
            segment(&self.alias),
            segment(&self.location)
        )
    }

    /// Deployment capabilities document, fetched on first use.
    pub async fn deployment_capabilities(&mut self, cached: bool) -> Result<&Value> {
        if !cached || self.deployment_capabilities.is_none() {
            let path = format!("{}/deploymentCapabilities", self.path());
            self.deployment_capabilities = Some(self.client.get(&path).await?);
            debug!("Loaded deployment capabilities for {}", self.location);
        }
        loaded(&self.deployment_capabilities, "deployment capabilities")
    }

    /// Bare metal capabilities, when the datacenter supports bare metal servers.
    pub async fn bare_metal_capabilities(&mut self, cached: bool) -> Result<Option<&Value>> {
        let supported = self
            .deployment_capabilities(true)
            .await?
            .get("supportsBareMetalServers")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if supported && (!cached || self.baremetal_capabilities.is_none()) {
            let path = format!("{}/bareMetalCapabilities", self.path());
            self.baremetal_capabilities = Some(self.client.get(&path).await?);
        }
        Ok(self.baremetal_capabilities.as_ref())
    }

    /// Networks in this datacenter.
    ///
    /// Without `forced_load` the deployable networks of the capabilities
    /// document are used; otherwise the full network list is fetched.
    pub async fn networks(&mut self, forced_load: bool) -> Result<Networks> {
        if forced_load {
            return Networks::load(self.client.clone(), Some(&self.alias), &self.location).await;
        }

        let list = self
            .deployment_capabilities(true)
            .await?
            .get("deployableNetworks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Networks::from_list(self.client.clone(), self.alias.clone(), &list))
    }

    /// Templates deployable in this datacenter.
    pub async fn templates(&mut self) -> Result<Templates> {
        let caps = self.deployment_capabilities(true).await?;
        let list = caps
            .get("templates")
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or_default();
        Ok(Templates::from_list(list))
    }

    pub async fn root_group(&self) -> Result<Group> {
        Group::get(self.client.clone(), &self.root_group_id, Some(&self.alias)).await
    }

    /// Groups directly below the root group.
    pub async fn groups(&self) -> Result<Vec<Group>> {
        Ok(self.root_group().await?.subgroups())
    }

    pub async fn supports_premium_storage(&mut self) -> Result<bool> {
        Ok(self.get_attr("supports_premium_storage").await?.as_bool().unwrap_or(false))
    }

    pub async fn supports_shared_load_balancer(&mut self) -> Result<bool> {
        Ok(self
            .get_attr("supports_shared_load_balancer")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    /// Resolve a capability attribute by name.
    ///
    /// Only `supports_premium_storage` and `supports_shared_load_balancer`
    /// are resolvable.
    pub async fn get_attr(&mut self, name: &str) -> Result<Value> {
        let key = api_key(name);
        let not_found = || Error::AttributeNotFound {
            kind: "Datacenter",
            name: name.to_string(),
        };

        if !CAPABILITY_ATTRS.contains(&key.as_str()) {
            return Err(not_found());
        }
        self.deployment_capabilities(true)
            .await?
            .get(&key)
            .cloned()
            .ok_or_else(not_found)
    }
}

impl std::fmt::Display for Datacenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_api;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_datacenter(server: &MockServer, alias: &str, location: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/datacenters/{}/{}", alias, location)))
            .and(query_param("GroupLinks", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": location.to_lowercase(),
                "name": "test_dc_name",
                "links": [
                    {"rel": "self", "href": "/v2/datacenters/x/y"},
                    {"rel": "group", "href": "/v2/groups/x/g", "id": "test_group_id", "name": "test_group_name"}
                ]
            })))
            .mount(server)
            .await;
    }

    async fn mount_capabilities(server: &MockServer, body: Value) {
        Mock::given(method("GET"))
            .and(path("/v2/datacenters/007/test123/deploymentCapabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_default_constructor_uses_account() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "ALIAS", "WA1").await;

        let dc = Datacenter::get(client, None, None).await.unwrap();

        assert_eq!(dc.id(), "WA1");
        assert_eq!(dc.alias(), "ALIAS");
        assert_eq!(dc.location(), "WA1");
        assert_eq!(dc.name(), "test_dc_name");
        assert_eq!(dc.root_group_id(), "test_group_id");
        assert_eq!(dc.root_group_name(), "test_group_name");
    }

    #[tokio::test]
    async fn test_constructor_all_args() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;

        let dc = Datacenter::get(client, Some("test123"), Some("007")).await.unwrap();

        assert_eq!(dc.id(), "test123");
        assert_eq!(dc.alias(), "007");
        assert_eq!(dc.to_string(), "test123");
    }

    #[tokio::test]
    async fn test_list() {
        let (server, client) = mock_api().await;
        Mock::given(method("GET"))
            .and(path("/v2/datacenters/ALIAS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "WA1", "name": "US West (Seattle)"},
                {"id": "UC1", "name": "US West (Santa Clara)"}
            ])))
            .mount(&server)
            .await;
        mount_datacenter(&server, "ALIAS", "WA1").await;
        mount_datacenter(&server, "ALIAS", "UC1").await;

        let dcs = Datacenter::list(client, None).await.unwrap();
        let ids: Vec<_> = dcs.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["WA1", "UC1"]);
    }

    #[tokio::test]
    async fn test_networks_from_capabilities() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;
        mount_capabilities(
            &server,
            json!({
                "supportsPremiumStorage": true,
                "supportsSharedLoadBalancer": false,
                "deployableNetworks": [
                    {"networkId": "n1", "accountID": "007", "name": "vlan_1", "type": "private"}
                ],
                "templates": [{"name": "CENTOS-7-64-TEMPLATE", "description": "CentOS 7"}]
            }),
        )
        .await;

        let mut dc = Datacenter::get(client, Some("test123"), Some("007")).await.unwrap();

        let networks = dc.networks(false).await.unwrap();
        assert_eq!(networks.networks()[0].id(), "n1");

        // Served from the cached capabilities document.
        assert!(dc.supports_premium_storage().await.unwrap());
        assert!(!dc.supports_shared_load_balancer().await.unwrap());
        assert_eq!(dc.templates().await.unwrap().templates().len(), 1);
    }

    #[tokio::test]
    async fn test_networks_forced_load() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;
        Mock::given(method("GET"))
            .and(path("/v2-experimental/networks/007/test123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "n9", "name": "vlan_9", "cidr": "10.0.9.0/24"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let mut dc = Datacenter::get(client, Some("test123"), Some("007")).await.unwrap();
        let networks = dc.networks(true).await.unwrap();

        assert_eq!(networks.get("10.0.9.0/24").unwrap().id(), "n9");
    }

    #[tokio::test]
    async fn test_get_attr_unknown() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;

        let mut dc = Datacenter::get(client.clone(), Some("test123"), Some("007"))
            .await
            .unwrap();
        let calls = client.metrics().snapshot().api_calls;

        let err = dc.get_attr("favourite_colour").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "'Datacenter' instance has no attribute 'favourite_colour'"
        );
        assert_eq!(client.metrics().snapshot().api_calls, calls);
    }

    #[tokio::test]
    async fn test_bare_metal_unsupported() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;
        mount_capabilities(&server, json!({"supportsBareMetalServers": false})).await;

        let mut dc = Datacenter::get(client, Some("test123"), Some("007")).await.unwrap();
        assert!(dc.bare_metal_capabilities(true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bare_metal_supported() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;
        mount_capabilities(&server, json!({"supportsBareMetalServers": true})).await;
        Mock::given(method("GET"))
            .and(path("/v2/datacenters/007/test123/bareMetalCapabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "skus": [{"id": "529e2592a3e640a7c2617b5e8bc8feaed95eab22"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut dc = Datacenter::get(client, Some("test123"), Some("007")).await.unwrap();
        assert!(dc.bare_metal_capabilities(true).await.unwrap().is_some());
        assert!(dc.bare_metal_capabilities(true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_groups() {
        let (server, client) = mock_api().await;
        mount_datacenter(&server, "007", "test123").await;
        Mock::given(method("GET"))
            .and(path("/v2/groups/007/test_group_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "test_group_id",
                "name": "test_group_name",
                "groups": [{"id": "child", "name": "Child"}]
            })))
            .mount(&server)
            .await;

        let dc = Datacenter::get(client, Some("test123"), Some("007")).await.unwrap();
        let groups = dc.groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id(), "child");
    }
}
