//! Server templates listed by a datacenter's deployment capabilities.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A template servers can be built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "storageSizeGB")]
    pub storage_size_gb: Option<u64>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub reserved_drive_paths: Vec<String>,
    #[serde(default)]
    pub drive_path_length: Option<u32>,
}

/// Templates available in a datacenter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Templates {
    templates: Vec<Template>,
}

impl Templates {
    /// Parse the `templates` list of a deployment capabilities document.
    ///
    /// Entries that are not template objects are skipped.
    pub fn from_list(list: &[Value]) -> Self {
        let templates = list
            .iter()
            .filter_map(|t| serde_json::from_value(t.clone()).ok())
            .collect();
        Self { templates }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// First template whose name or description equals `key`.
    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.name == key || t.description == key)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_list_and_get() {
        let list = vec![
            json!({
                "name": "CENTOS-7-64-TEMPLATE",
                "description": "CentOS 7 | 64-bit",
                "storageSizeGB": 17,
                "capabilities": ["cpuAutoscale"],
                "reservedDrivePaths": ["bin", "boot"]
            }),
            json!({"name": "UBUNTU-18-64-TEMPLATE", "description": "Ubuntu 18 | 64-bit"}),
            json!("not a template"),
        ];

        let templates = Templates::from_list(&list);

        assert_eq!(templates.templates().len(), 2);
        let centos = templates.get("CENTOS-7-64-TEMPLATE").unwrap();
        assert_eq!(centos.storage_size_gb, Some(17));
        assert_eq!(centos.reserved_drive_paths, vec!["bin", "boot"]);
        assert_eq!(
            templates.get("Ubuntu 18 | 64-bit").unwrap().to_string(),
            "UBUNTU-18-64-TEMPLATE"
        );
        assert!(templates.get("WIN2019").is_none());
    }
}
