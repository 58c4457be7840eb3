//! Network bindings (`/v2-experimental/networks`).

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::queue::Requests;
use crate::resources::{id_string, lookup_attr, str_field};
use crate::sdk::{segment, ApiClient, Payload};

fn networks_path(alias: &str, location: &str) -> String {
    format!(
        "/v2-experimental/networks/{}/{}",
        segment(alias),
        segment(location)
    )
}

/// All networks of an account in one location.
#[derive(Debug, Clone)]
pub struct Networks {
    alias: String,
    networks: Vec<Network>,
}

impl Networks {
    /// Load all networks in `location`.
    pub async fn load(client: ApiClient, alias: Option<&str>, location: &str) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let response = client.get(&networks_path(&alias, location)).await?;

        let networks = response
            .as_array()
            .map(|items| items.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|item| {
                let id = item.get("id").and_then(id_string)?;
                Some(Network::from_data(client.clone(), id, alias.clone(), item.clone()))
            })
            .collect();

        Ok(Self { alias, networks })
    }

    /// Build from a deployable network list, without fetching.
    ///
    /// Entries carry `networkId` and `accountID` rather than `id`.
    pub fn from_list(client: ApiClient, alias: impl Into<String>, list: &[Value]) -> Self {
        let alias = alias.into();
        let networks = list
            .iter()
            .filter_map(|item| {
                let id = item.get("networkId").and_then(id_string)?;
                let owner = str_field(item, "accountID").unwrap_or(&alias).to_string();
                Some(Network::from_data(client.clone(), id, owner, item.clone()))
            })
            .collect();

        Self { alias, networks }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    /// First network whose id, name or cidr equals `key`.
    pub fn get(&self, key: &str) -> Option<&Network> {
        self.networks
            .iter()
            .find(|n| n.id() == key || n.name() == key || n.cidr() == Some(key))
    }
}

/// A network, mirroring the API's JSON document.
#[derive(Debug, Clone)]
pub struct Network {
    client: ApiClient,
    id: String,
    alias: String,
    name: String,
    data: Value,
}

impl Network {
    /// Fetch a network.
    ///
    /// # Errors
    ///
    /// `"Network does not exist"` on 404; any other API failure is reported
    /// as `"An error occurred while creating the Network object"`.
    pub async fn get(
        client: ApiClient,
        id: impl Into<String>,
        alias: Option<&str>,
        location: Option<&str>,
    ) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let mut network = Self {
            client,
            id: id.into(),
            alias,
            name: String::new(),
            data: Value::Null,
        };

        match network.refresh(location).await {
            Ok(()) => Ok(network),
            Err(e) if e.is_not_found() => Err(Error::clc("Network does not exist")),
            Err(Error::Api { .. }) => Err(Error::clc(
                "An error occurred while creating the Network object",
            )),
            Err(e) => Err(e),
        }
    }

    /// Wrap an already known network document.
    pub fn from_data(
        client: ApiClient,
        id: impl Into<String>,
        alias: impl Into<String>,
        data: Value,
    ) -> Self {
        let name = str_field(&data, "name").unwrap_or_default().to_string();
        Self {
            client,
            id: id.into(),
            alias: alias.into(),
            name,
            data,
        }
    }

    /// Claim a new network in `location`.
    pub async fn create(
        client: ApiClient,
        alias: Option<&str>,
        location: Option<&str>,
    ) -> Result<Requests> {
        let alias = client.resolve_alias(alias).await?;
        let location = client.resolve_location(location).await?;

        let path = format!("{}/claim", networks_path(&alias, &location));
        let response = client.post(&path, Payload::Empty).await?;
        Requests::from_response(client, &response, Some(&alias)).await
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cidr(&self) -> Option<&str> {
        str_field(&self.data, "cidr")
    }

    pub fn description(&self) -> Option<&str> {
        str_field(&self.data, "description")
    }

    pub fn gateway(&self) -> Option<&str> {
        str_field(&self.data, "gateway")
    }

    pub fn netmask(&self) -> Option<&str> {
        str_field(&self.data, "netmask")
    }

    pub fn network_type(&self) -> Option<&str> {
        str_field(&self.data, "type")
    }

    pub fn vlan(&self) -> Option<i64> {
        self.data.get("vlan").and_then(Value::as_i64)
    }

    /// Cached network document.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Resolve any other attribute from the cached document.
    pub fn get_attr(&self, name: &str) -> Result<&Value> {
        lookup_attr(&self.data, "Network", name)
    }

    fn path(&self, location: &str) -> String {
        format!("{}/{}", networks_path(&self.alias, location), segment(&self.id))
    }

    /// Release the network back to the pool.
    pub async fn delete(&self, location: Option<&str>) -> Result<Value> {
        let location = self.client.resolve_location(location).await?;
        self.client
            .post(&format!("{}/release", self.path(&location)), Payload::Empty)
            .await
    }

    /// Rename the network and optionally change its description.
    ///
    /// Without a new description the cached one is sent back unchanged.
    pub async fn update(
        &mut self,
        name: &str,
        description: Option<&str>,
        location: Option<&str>,
    ) -> Result<()> {
        let location = self.client.resolve_location(location).await?;
        let description = description
            .or_else(|| self.description())
            .map(String::from);

        let payload = json!({"name": name, "description": description});
        self.client
            .put(&self.path(&location), Payload::Json(payload))
            .await?;

        self.name = name.to_string();
        if let Value::Object(map) = &mut self.data {
            map.insert("name".to_string(), json!(name));
            if let Some(description) = description {
                map.insert("description".to_string(), json!(description));
            }
        } else {
            self.data = json!({"name": name, "description": description});
        }
        Ok(())
    }

    /// Reload the network document from the API.
    pub async fn refresh(&mut self, location: Option<&str>) -> Result<()> {
        let location = self.client.resolve_location(location).await?;
        let response = self.client.get(&self.path(&location)).await?;
        debug!("Refreshed network {}", self.id);

        if response.as_object().is_some_and(|o| !o.is_empty()) {
            self.name = str_field(&response, "name").unwrap_or_default().to_string();
            self.data = response;
        }
        Ok(())
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.alias == other.alias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_api;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_list(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v2-experimental/networks/007/TST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 12345, "cidr": "192.168.10.0/24", "name": "fake_network_one"},
                {"id": 54321, "cidr": "172.22.10.0/24", "name": "fake_network_two"},
                {"id": 90210, "cidr": "192.42.10.0/24", "name": "fake_network_three"}
            ])))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_from_data_does_not_fetch() {
        let (_server, client) = mock_api().await;
        let data = json!({"name": "testme", "other": "more_data"});

        let network = Network::from_data(client.clone(), "43", "XYZ", data.clone());

        assert_eq!(network.id(), "43");
        assert_eq!(network.alias(), "XYZ");
        assert_eq!(network.name(), "testme");
        assert_eq!(network.data(), &data);
        assert_eq!(network.to_string(), "43");
        assert_eq!(client.metrics().snapshot().api_calls, 0);
    }

    #[tokio::test]
    async fn test_get_fetches_exactly_once() {
        let (server, client) = mock_api().await;
        Mock::given(method("GET"))
            .and(path("/v2-experimental/networks/ALIAS/WA1/n42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "n42", "name": "vlan_42", "cidr": "10.0.42.0/24", "vlan": 42
            })))
            .expect(1)
            .mount(&server)
            .await;

        let network = Network::get(client, "n42", None, None).await.unwrap();

        assert_eq!(network.alias(), "ALIAS");
        assert_eq!(network.name(), "vlan_42");
        assert_eq!(network.cidr(), Some("10.0.42.0/24"));
        assert_eq!(network.vlan(), Some(42));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let (server, client) = mock_api().await;
        Mock::given(method("GET"))
            .and(path("/v2-experimental/networks/ALIAS/WA1/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = Network::get(client, "missing", None, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Network does not exist");
    }

    #[tokio::test]
    async fn test_get_other_failure() {
        let (server, client) = mock_api().await;
        Mock::given(method("GET"))
            .and(path("/v2-experimental/networks/ALIAS/WA1/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = Network::get(client, "broken", None, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "An error occurred while creating the Network object"
        );
    }

    #[tokio::test]
    async fn test_get_attr() {
        let (_server, client) = mock_api().await;
        let data = json!({"name": "Name", "field1": "value1", "changeInfo": {"change1": "changeVal1"}});
        let network = Network::from_data(client, "12345", "007", data);

        assert_eq!(network.get_attr("field1").unwrap(), "value1");
        assert_eq!(network.get_attr("change1").unwrap(), "changeVal1");
        assert!(matches!(
            network.get_attr("does_not_exist").unwrap_err(),
            Error::AttributeNotFound { kind: "Network", .. }
        ));
    }

    #[tokio::test]
    async fn test_networks_load_and_get() {
        let (server, client) = mock_api().await;
        mount_list(&server).await;

        let networks = Networks::load(client, Some("007"), "TST").await.unwrap();

        assert_eq!(networks.networks().len(), 3);
        assert_eq!(networks.get("90210"), Some(&networks.networks()[2]));
        assert_eq!(networks.get("fake_network_one"), Some(&networks.networks()[0]));
        assert_eq!(networks.get("172.22.10.0/24"), Some(&networks.networks()[1]));
        assert_eq!(networks.get("nothing_here"), None);
    }

    #[tokio::test]
    async fn test_networks_from_list() {
        let (_server, client) = mock_api().await;
        let list = vec![json!({"networkId": 24601, "accountID": "XYZ", "name": "NAME"})];

        let networks = Networks::from_list(client.clone(), "007", &list);

        assert_eq!(networks.networks().len(), 1);
        assert_eq!(networks.networks()[0].id(), "24601");
        assert_eq!(networks.networks()[0].alias(), "XYZ");
        assert_eq!(client.metrics().snapshot().api_calls, 0);
    }

    #[tokio::test]
    async fn test_create_claims_network() {
        let (server, client) = mock_api().await;
        Mock::given(method("POST"))
            .and(path("/v2-experimental/networks/ALIAS/WA1/claim"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "operationId": "op-claim",
                "uri": "/v2-experimental/operations/ALIAS/status/op-claim"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let requests = Network::create(client, None, None).await.unwrap();
        assert_eq!(requests.requests()[0].id(), "op-claim");
    }

    #[tokio::test]
    async fn test_update_keeps_description() {
        let (server, client) = mock_api().await;
        Mock::given(method("PUT"))
            .and(path("/v2-experimental/networks/ALIAS/WA1/n1"))
            .and(body_json(json!({"name": "renamed", "description": "original"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let data = json!({"name": "old", "description": "original"});
        let mut network = Network::from_data(client, "n1", "ALIAS", data);
        network.update("renamed", None, None).await.unwrap();

        assert_eq!(network.name(), "renamed");
        assert_eq!(network.data()["name"], "renamed");
        assert_eq!(network.description(), Some("original"));
    }

    #[tokio::test]
    async fn test_delete_releases() {
        let (server, client) = mock_api().await;
        Mock::given(method("POST"))
            .and(path("/v2-experimental/networks/ALIAS/UC1/n1/release"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let network = Network::from_data(client, "n1", "ALIAS", json!({"name": "n"}));
        network.delete(Some("UC1")).await.unwrap();
    }
}
