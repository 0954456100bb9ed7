//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ledgerlink::test_utils::login_response_json;
use ledgerlink::{Client, ClientConfig};

/// A base URL nothing listens on; requests fail with a connection error.
pub const DEAD_BASE_URL: &str = "http://127.0.0.1:1";

/// One test's world: a mock ledger service plus a client with private
/// temp-dir storage.
pub struct TestEnv {
    pub server: MockServer,
    pub storage: TempDir,
    pub client: Client,
}

/// Build a client against a fresh mock server and temp storage.
pub async fn test_env() -> TestEnv {
    test_env_with_quota(None).await
}

/// Same as [`test_env`] but with a storage byte quota.
pub async fn test_env_with_quota(quota: Option<u64>) -> TestEnv {
    let server = MockServer::start().await;
    let storage = TempDir::new().expect("temp dir");
    let client = build_client(&server.uri(), storage.path(), quota);
    TestEnv {
        server,
        storage,
        client,
    }
}

/// Build a client over an existing storage directory (e.g. to simulate a
/// process restart or an offline session against previously cached data).
pub fn build_client(base_url: &str, storage_dir: &Path, quota: Option<u64>) -> Client {
    let mut config = ClientConfig::new(base_url)
        .with_timeout(Duration::from_secs(5))
        .with_storage_dir(storage_dir);
    if let Some(quota) = quota {
        config = config.with_storage_quota(quota);
    }
    Client::new(config).expect("client construction")
}

/// Mount the login endpoint returning the given token pair and log in.
pub async fn login_as(env: &TestEnv, username: &str, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(login_response_json(username, access, refresh)),
        )
        .mount(&env.server)
        .await;

    env.client
        .session()
        .login(&ledgerlink::auth::Credentials {
            username: username.to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .expect("login should succeed");
}

/// Mount the refresh endpoint returning a new access token.
pub async fn mount_refresh(server: &MockServer, new_access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ledgerlink::test_utils::refresh_response_json(new_access)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Write a raw JSON value into the client's storage directory under a cache
/// key, the way the file backend lays keys out (one `<key>.json` per key).
pub fn seed_storage(storage_dir: &Path, key: &str, json: &str) {
    std::fs::write(storage_dir.join(format!("{key}.json")), json).expect("seed storage");
}

/// Read a raw stored value back out of the storage directory.
pub fn read_storage(storage_dir: &Path, key: &str) -> Option<String> {
    std::fs::read_to_string(storage_dir.join(format!("{key}.json"))).ok()
}
