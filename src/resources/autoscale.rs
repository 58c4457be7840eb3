//! Horizontal autoscale policies (`horizontalAutoscalePolicies/{alias}`).

use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::resources::{id_string, lookup_attr, str_field};
use crate::sdk::{segment, ApiClient, Payload};

/// A horizontal autoscale policy.
#[derive(Debug, Clone)]
pub struct HorizontalAutoscalePolicy {
    client: ApiClient,
    id: String,
    alias: String,
    data: Value,
    dirty: bool,
}

impl HorizontalAutoscalePolicy {
    /// All policies for the account.
    pub async fn get_all(client: ApiClient, alias: Option<&str>) -> Result<Vec<Self>> {
        let alias = client.resolve_alias(alias).await?;
        let response = client
            .get(&format!("horizontalAutoscalePolicies/{}", segment(&alias)))
            .await?;

        let items = response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.as_slice())
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                let id = item.get("id").and_then(id_string)?;
                Some(Self::from_data(client.clone(), id, alias.clone(), item.clone()))
            })
            .collect())
    }

    /// Fetch one policy. 404 is reported as
    /// `"Horizontal Autoscale Policy does not exist"`.
    pub async fn get(client: ApiClient, id: impl Into<String>, alias: Option<&str>) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let mut policy = Self::from_data(client, id, alias, Value::Null);

        match policy.refresh().await {
            Ok(()) => Ok(policy),
            Err(e) if e.is_not_found() => {
                Err(Error::clc("Horizontal Autoscale Policy does not exist"))
            }
            Err(e) => Err(e),
        }
    }

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
            dirty: false,
        }
    }

    /// Create a policy from its JSON definition.
    pub async fn create(client: ApiClient, policy: Value, alias: Option<&str>) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let data = client
            .post(
                &format!("horizontalAutoscalePolicies/{}", segment(&alias)),
                Payload::Json(policy),
            )
            .await?;

        let id = data
            .get("id")
            .and_then(id_string)
            .ok_or_else(|| Error::clc("Created policy has no id"))?;
        info!("Created horizontal autoscale policy {}", id);
        Ok(Self::from_data(client, id, alias, data))
    }

    /// Detach whatever policy is applied to a group.
    pub async fn remove_from_group(
        client: ApiClient,
        group_id: &str,
        alias: Option<&str>,
    ) -> Result<Value> {
        let alias = client.resolve_alias(alias).await?;
        client
            .delete(&group_policy_path(&alias, group_id))
            .await
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn name(&self) -> Option<&str> {
        str_field(&self.data, "name")
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// True once the policy was deleted and not reloaded since.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get_attr(&self, name: &str) -> Result<&Value> {
        lookup_attr(&self.data, "HorizontalAutoscalePolicy", name)
    }

    fn path(&self) -> String {
        format!(
            "horizontalAutoscalePolicies/{}/{}",
            segment(&self.alias),
            segment(&self.id)
        )
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.data = self.client.get(&self.path()).await?;
        self.dirty = false;
        Ok(())
    }

    /// Replace the policy definition. The cache takes the response.
    pub async fn update(&mut self, policy: Value) -> Result<()> {
        self.data = self.client.put(&self.path(), Payload::Json(policy)).await?;
        Ok(())
    }

    pub async fn delete(&mut self) -> Result<Value> {
        self.dirty = true;
        self.client.delete(&self.path()).await
    }

    /// Apply this policy to a group.
    pub async fn apply_to_group(&self, group_id: &str) -> Result<Value> {
        self.client
            .put(
                &group_policy_path(&self.alias, group_id),
                Payload::params([("policyId", self.id.as_str())]),
            )
            .await
    }
}

fn group_policy_path(alias: &str, group_id: &str) -> String {
    format!(
        "groups/{}/{}/horizontalAutoscalePolicy",
        segment(alias),
        segment(group_id)
    )
}

impl std::fmt::Display for HorizontalAutoscalePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
