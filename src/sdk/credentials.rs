//! Credential resolution for the v2 API.
//!
//! Credentials are resolved in order:
//! 1. Explicit options
//! 2. Environment variables (CLC_V2_API_USERNAME, CLC_V2_API_PASSWD)
//! 3. Credentials file (~/.clc/credentials.json)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Error, Result};

/// Environment variable holding the API username.
pub const USERNAME_ENV: &str = "CLC_V2_API_USERNAME";

/// Environment variable holding the API password.
pub const PASSWORD_ENV: &str = "CLC_V2_API_PASSWD";

/// Username and password used to obtain a bearer token.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials file structure.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    username: Option<String>,
    password: Option<String>,
}

/// Get the path to the credentials file.
pub fn credentials_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".clc").join("credentials.json"))
}

async fn read_credentials_file(path: &Path) -> Option<CredentialsFile> {
    let content = fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&content).ok()
}

/// Resolve credentials from options, environment, or the credentials file.
///
/// # Errors
///
/// Returns [`Error::ApiNotEnabled`] if either value cannot be resolved.
pub async fn resolve_credentials(
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Credentials> {
    resolve_credentials_from(username, password, credentials_file_path().as_deref()).await
}

/// Like [`resolve_credentials`] with an explicit credentials file location.
pub async fn resolve_credentials_from(
    username: Option<&str>,
    password: Option<&str>,
    file: Option<&Path>,
) -> Result<Credentials> {
    let mut resolved_username = username.map(String::from);
    let mut resolved_password = password.map(String::from);

    if resolved_username.is_none() {
        resolved_username = std::env::var(USERNAME_ENV).ok();
    }
    if resolved_password.is_none() {
        resolved_password = std::env::var(PASSWORD_ENV).ok();
    }

    if resolved_username.is_none() || resolved_password.is_none() {
        if let Some(path) = file {
            if let Some(stored) = read_credentials_file(path).await {
                if resolved_username.is_none() {
                    resolved_username = stored.username;
                }
                if resolved_password.is_none() {
                    resolved_password = stored.password;
                }
            }
        }
    }

    match (resolved_username, resolved_password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Ok(Credentials { username, password })
        }
        _ => Err(Error::ApiNotEnabled),
    }
}
