#![allow(dead_code)]

use carboncare_client::prelude::*;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const USER_ID: u64 = 7;

pub fn config(server: &MockServer) -> AppConfig {
    AppConfig::new(&server.uri()).with_environment(Environment::Test)
}

/// A client over a store the test can inspect
pub fn client(server: &MockServer) -> (CarbonCare, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = CarbonCare::with_store(config(server), store.clone()).unwrap();
    (client, store)
}

pub fn user_json() -> serde_json::Value {
    json!({
        "id": USER_ID,
        "name": "Sari",
        "email": "sari@example.com",
        "points": 120
    })
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": TOKEN,
            "user": user_json()
        })))
        .mount(server)
        .await;
}

/// A client that has already logged in, with the notification queue emptied
pub async fn signed_in(server: &MockServer) -> (CarbonCare, Arc<MemoryStore>) {
    mount_login(server).await;
    let (client, store) = client(server);
    client
        .auth()
        .login("sari@example.com", "password123")
        .await
        .unwrap();
    client.notifier().drain();
    (client, store)
}
