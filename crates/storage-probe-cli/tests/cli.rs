//! Tests of the `storage-probe` binary

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn storage_probe() -> Command {
    let mut cmd = Command::cargo_bin("storage-probe").unwrap();
    cmd.env_remove("STORAGE_PROBE_URL").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_inspect_prints_locator() {
    storage_probe()
        .args([
            "inspect",
            "@Microsoft.KeyVault(VaultName=kv;SecretName=storage1;SecretVersion=abc)",
        ])
        .assert()
        .success()
        .stdout("https://kv.vault.azure.net/secrets/storage1/abc\n");
}

#[test]
fn test_inspect_prints_literal_for_plain_value() {
    storage_probe()
        .args(["inspect", "DefaultEndpointsProtocol=https;AccountName=a"])
        .assert()
        .success()
        .stdout("literal\n");
}

#[test]
fn test_invalid_url_exits_with_argument_code() {
    storage_probe()
        .args(["--url", "ftp://probe", "delete"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn test_unreachable_service_exits_with_request_code() {
    storage_probe()
        .args(["--url", "http://127.0.0.1:1", "--timeout", "2", "delete"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_against_running_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test"))
        .and(query_param("name", "probe.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Storage1: ok\nStorage2: ok"),
        )
        .mount(&server)
        .await;

    let url = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        storage_probe()
            .env("STORAGE_PROBE_URL", url)
            .args(["download", "--name", "probe.txt"])
            .assert()
    })
    .await
    .unwrap();

    assert.success().stdout("Storage1: ok\nStorage2: ok\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_service_error_exits_with_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let url = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        storage_probe()
            .args(["--url", url.as_str(), "upload", "--name", "a", "--value", "b"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(3)
        .stderr(predicate::str::contains("Service returned status 500"));
}
