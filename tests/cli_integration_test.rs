//! CLI Integration Tests
//!
//! These tests run the `clc` binary. Calls that reach the API are served by
//! a local mock server.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `clc` with no ambient credentials, `.env` or credentials file.
fn clc(home: &TempDir) -> AssertCommand {
    let mut cmd = AssertCommand::cargo_bin("clc").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("CLC_V2_API_USERNAME")
        .env_remove("CLC_V2_API_PASSWD")
        .env_remove("CLC_V2_API_URL")
        .env_remove("CLC_ALIAS")
        .env_remove("CLC_LOCATION")
        .env_remove("CLC_OUTPUT");
    cmd
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/authentication/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userName": "user",
            "accountAlias": "ALIAS",
            "locationAlias": "WA1",
            "roles": [],
            "bearerToken": "test-token"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/datacenters/ALIAS/WA1"))
        .and(query_param("GroupLinks", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "WA1",
            "name": "US West (Seattle)",
            "links": [
                {"rel": "self", "href": "/v2/datacenters/ALIAS/WA1"},
                {"rel": "group", "href": "/v2/groups/ALIAS/root", "id": "root", "name": "WA1 Hardware"}
            ]
        })))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_binary_help() {
    let home = TempDir::new().unwrap();
    clc(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CenturyLink Cloud v2 API"));
}

#[test]
fn test_binary_version() {
    let home = TempDir::new().unwrap();
    clc(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("clc"));
}

#[test]
fn test_missing_credentials() {
    let home = TempDir::new().unwrap();
    clc(&home)
        .args(["--endpoint", "http://127.0.0.1:9", "datacenter", "get"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "V2 API username and password not provided",
        ));
}

#[test]
fn test_server_create_rejects_short_ttl() {
    let home = TempDir::new().unwrap();
    clc(&home)
        .args([
            "--endpoint",
            "http://127.0.0.1:9",
            "--alias",
            "x",
            "server",
            "create",
            "--name",
            "x",
            "--template",
            "x",
            "--group",
            "x",
            "--network",
            "x",
            "--cpu",
            "2",
            "--memory",
            "2",
            "--ttl",
            "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ttl must be greater than 3600 seconds",
        ));
}

#[test]
fn test_server_create_rejects_storage_combo() {
    let home = TempDir::new().unwrap();
    clc(&home)
        .args([
            "--alias",
            "x",
            "server",
            "create",
            "--name",
            "x",
            "--template",
            "x",
            "--group",
            "x",
            "--network",
            "x",
            "--type",
            "hyperscale",
            "--storage-type",
            "standard",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid type/storage_type combo"));
}

#[test]
fn test_unknown_power_operation() {
    let home = TempDir::new().unwrap();
    clc(&home)
        .args(["server", "op", "explode", "S1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_datacenter_get_json() {
    let server = mock_api().await;
    let endpoint = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        clc(&home)
            .args(["--endpoint", endpoint.as_str(), "-u", "user", "-p", "pass"])
            .args(["datacenter", "get"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    })
    .await
    .unwrap();

    let dc: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(dc["id"], "WA1");
    assert_eq!(dc["alias"], "ALIAS");
    assert_eq!(dc["rootGroupId"], "root");
    assert_eq!(dc["rootGroupName"], "WA1 Hardware");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_datacenter_get_yaml() {
    let server = mock_api().await;
    let endpoint = server.uri();

    tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        clc(&home)
            .args(["--endpoint", endpoint.as_str(), "-u", "user", "-p", "pass", "--output", "yaml"])
            .args(["datacenter", "get", "WA1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("rootGroupName: WA1 Hardware"));
    })
    .await
    .unwrap();
}
