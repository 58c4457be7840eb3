//! Wire types for the v2 API.

use serde::{Deserialize, Serialize};

/// Options for creating an [`ApiClient`](crate::sdk::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API endpoint, without the `/v2` suffix
    pub endpoint: String,
    /// Login credentials; without them every call fails with `ApiNotEnabled`
    pub credentials: Option<crate::sdk::Credentials>,
    /// Account alias override
    pub alias: Option<String>,
    /// Location override
    pub location: Option<String>,
    /// Verify TLS certificates
    pub ssl_verify: bool,
    /// Log full request/response dumps
    pub debug: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: crate::DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            alias: None,
            location: None,
            ssl_verify: true,
            debug: false,
        }
    }
}

/// Authenticated session state returned by login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub bearer_token: String,
    pub account_alias: String,
    pub location_alias: String,
}

/// Login response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub bearer_token: String,
    pub account_alias: String,
    pub location_alias: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl From<LoginResponse> for Session {
    fn from(r: LoginResponse) -> Self {
        Self {
            bearer_token: r.bearer_token,
            account_alias: r.account_alias,
            location_alias: r.location_alias,
        }
    }
}

/// Hypermedia link attached to API resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of a mutating call's response describing a queued operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationItem {
    /// Server the operation targets (batch server operations)
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub is_queued: bool,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Operation id (network claim, add NIC)
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl OperationItem {
    /// Id of the queued operation: the `status` link, else the first link.
    pub fn status_id(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "status")
            .or_else(|| self.links.first())
            .and_then(|l| l.id.as_deref())
    }

    /// Path of the returned status `uri`, for use with [`ApiClient::url`](crate::sdk::ApiClient::url).
    pub fn status_path(&self) -> Option<String> {
        let uri = self.uri.as_deref()?;
        if uri.starts_with('/') {
            return Some(uri.to_string());
        }
        reqwest::Url::parse(uri).ok().map(|url| url.path().to_string())
    }
}

/// Response of `GET operations/{alias}/status/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: crate::queue::RequestStatus,
}
