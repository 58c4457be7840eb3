//! Group bindings (`groups/{alias}/{id}`).

use serde_json::Value;

use crate::error::{Error, Result};
use crate::resources::{id_string, lookup_attr, str_field};
use crate::sdk::{segment, ApiClient};

/// A server group.
#[derive(Debug, Clone)]
pub struct Group {
    client: ApiClient,
    id: String,
    alias: String,
    data: Value,
    defaults: Option<Value>,
}

impl Group {
    /// Fetch a group. 404 is reported as `"Group does not exist"`.
    pub async fn get(client: ApiClient, id: impl Into<String>, alias: Option<&str>) -> Result<Self> {
        let alias = client.resolve_alias(alias).await?;
        let mut group = Self {
            client,
            id: id.into(),
            alias,
            data: Value::Null,
            defaults: None,
        };

        match group.refresh().await {
            Ok(()) => Ok(group),
            Err(e) if e.is_not_found() => Err(Error::clc("Group does not exist")),
            Err(e) => Err(e),
        }
    }

    /// Wrap an already known group document.
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
            defaults: None,
        }
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

    pub fn description(&self) -> Option<&str> {
        str_field(&self.data, "description")
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn get_attr(&self, name: &str) -> Result<&Value> {
        lookup_attr(&self.data, "Group", name)
    }

    fn path(&self) -> String {
        format!("groups/{}/{}", segment(&self.alias), segment(&self.id))
    }

    /// Reload the group document.
    pub async fn refresh(&mut self) -> Result<()> {
        self.data = self.client.get(&self.path()).await?;
        Ok(())
    }

    /// Group default for `key` (e.g. `cpu`, `memory`), if one is set.
    ///
    /// The defaults document is fetched once and cached.
    pub async fn defaults(&mut self, key: &str) -> Result<Option<Value>> {
        if self.defaults.is_none() {
            let path = format!("{}/defaults", self.path());
            self.defaults = Some(self.client.get(&path).await?);
        }

        Ok(self
            .defaults
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(|entry| entry.get("value"))
            .filter(|v| !v.is_null())
            .cloned())
    }

    /// Child groups embedded in the cached document.
    pub fn subgroups(&self) -> Vec<Group> {
        self.data
            .get("groups")
            .and_then(Value::as_array)
            .map(|groups| groups.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|g| {
                let id = g.get("id").and_then(id_string)?;
                Some(Group::from_data(self.client.clone(), id, self.alias.clone(), g.clone()))
            })
            .collect()
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name().unwrap_or(&self.id))
    }
}
