//! Bindings for the v2 API resources.
//!
//! Every resource keeps the JSON document last returned by the API. Typed
//! accessors cover the documented fields; [`lookup_attr`] resolves anything
//! else by name.

pub mod autoscale;
pub mod datacenter;
pub mod group;
pub mod network;
pub mod server;
pub mod template;

pub use autoscale::HorizontalAutoscalePolicy;
pub use datacenter::Datacenter;
pub use group::Group;
pub use network::{Network, Networks};
pub use server::{PowerOperation, Server, ServerSpec, ServerType, Servers, StorageType};
pub use template::{Template, Templates};

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Nested objects searched after the top level of a resource document.
const NESTED_SECTIONS: [&str; 2] = ["details", "changeInfo"];

static SNAKE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_(.)").expect("valid regex"));

/// Convert a snake_case attribute name to the API's camelCase.
pub fn api_key(name: &str) -> String {
    SNAKE_SEGMENT
        .replace_all(name, |caps: &regex::Captures| caps[1].to_uppercase())
        .into_owned()
}

/// Resolve an attribute from a cached resource document.
///
/// The name is converted to camelCase and looked up at the top level, then
/// inside the `details` and `changeInfo` sections.
pub fn lookup_attr<'a>(data: &'a Value, kind: &'static str, name: &str) -> Result<&'a Value> {
    let key = api_key(name);

    data.get(&key)
        .or_else(|| {
            NESTED_SECTIONS
                .iter()
                .find_map(|section| data.get(section).and_then(|s| s.get(&key)))
        })
        .ok_or(Error::AttributeNotFound { kind, name: key })
}

/// Render an identifier that the API may send as a string or a number.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// String field of a resource document.
pub(crate) fn str_field<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}
