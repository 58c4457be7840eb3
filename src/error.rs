//! Error types for the CLC SDK.

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK and CLI.
#[derive(Error, Debug)]
pub enum Error {
    // ===== API Errors =====
    /// Non-2xx response from the v2 API.
    #[error("Response code {status}. {message}. {method} {url}")]
    Api {
        status: u16,
        message: String,
        method: String,
        url: String,
        /// Parsed response body, `Null` when the body was not JSON.
        json: serde_json::Value,
        /// Raw response body.
        text: String,
    },

    #[error("V2 API username and password not provided")]
    ApiNotEnabled,

    #[error("{0}")]
    Login(String),

    // ===== Domain Errors =====
    #[error("{0}")]
    Clc(String),

    #[error("{context} execution {status}")]
    OperationFailed { context: String, status: String },

    #[error("'{kind}' instance has no attribute '{name}'")]
    AttributeNotFound { kind: &'static str, name: String },

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ===== HTTP Errors =====
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // ===== Internal Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an API error from a failed response.
    ///
    /// The message is taken from the body's `message` field when the body is
    /// JSON, otherwise the raw text is used.
    pub fn api(
        status: u16,
        method: impl Into<String>,
        url: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let json: serde_json::Value =
            serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        let message = json
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| text.clone());

        Self::Api {
            status,
            message,
            method: method.into(),
            url: url.into(),
            json,
            text,
        }
    }

    /// Shorthand for a domain error with a fixed message.
    pub fn clc(message: impl Into<String>) -> Self {
        Self::Clc(message.into())
    }

    /// HTTP status code of an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is an API 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Parsed JSON body of an API error.
    pub fn response_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { json, .. } if !json.is_null() => Some(json),
            _ => None,
        }
    }
}
