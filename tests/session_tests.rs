mod common;

use carboncare_client::auth::RegisterRequest;
use carboncare_client::dashboard::DashboardSummary;
use carboncare_client::notify::Level;
use carboncare_client::prelude::*;
use carboncare_client::storage::{TOKEN_KEY, USER_ID_KEY};
use common::{client, mount_login, signed_in, user_json, TOKEN, USER_ID};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_persists_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "sari@example.com",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": TOKEN,
            "user": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client(&server);
    assert!(client.auth().is_loading());

    let user = client
        .auth()
        .login("sari@example.com", "password123")
        .await
        .unwrap();

    assert_eq!(user.id, USER_ID);
    assert!(client.auth().is_authenticated());
    assert_eq!(client.auth().session().token.as_deref(), Some(TOKEN));
    assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some(TOKEN));
    assert_eq!(store.get(USER_ID_KEY).await.unwrap().as_deref(), Some("7"));
    assert_eq!(client.navigator().current(), Route::Dashboard);

    let notifications = client.notifier().drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, Level::Success);
    assert_eq!(notifications[0].message, "Login successful!");
}

#[tokio::test]
async fn test_logout_clears_credentials() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    client.logout().await.unwrap();

    assert_eq!(client.auth().status(), SessionStatus::Unauthenticated);
    assert!(client.auth().user().is_none());
    assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    assert_eq!(store.get(USER_ID_KEY).await.unwrap(), None);
    assert_eq!(client.navigator().current(), Route::Home);
    assert!(client.missions().user_missions().is_empty());
}

#[tokio::test]
async fn test_failed_login_shows_server_message_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client(&server);
    let err = client
        .auth()
        .login("sari@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 400, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(client.auth().status(), SessionStatus::Unauthenticated);
    assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);

    let errors = client.notifier().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "invalid credentials");
}

#[tokio::test]
async fn test_register_signs_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "name": "Sari",
            "email": "sari@example.com",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access_token": TOKEN,
            "user": user_json()
        })))
        .mount(&server)
        .await;

    let (client, store) = client(&server);
    let request = RegisterRequest::new("Sari", "sari@example.com", "password123");
    let user = client.auth().register(&request).await.unwrap();

    assert_eq!(user.name, "Sari");
    assert!(client.auth().is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some(TOKEN));
    assert_eq!(
        client.notifier().drain()[0].message,
        "Registration successful!"
    );
}

#[tokio::test]
async fn test_unauthorized_response_signs_out_locally() {
    let server = MockServer::start().await;
    let (client, store) = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/7/missions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 30, "user_id": 7, "mission_id": 1, "status": "completed" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "token expired" })))
        .expect(1)
        .mount(&server)
        .await;

    client.missions().fetch_user_missions().await.unwrap();
    assert_eq!(client.dashboard().completed_missions, 1);

    let err = client.missions().fetch_missions().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    assert_eq!(store.get(USER_ID_KEY).await.unwrap(), None);
    assert_eq!(client.navigator().current(), Route::Login);
    assert_eq!(client.navigator().current().path(), "/login");

    assert_eq!(client.auth().status(), SessionStatus::Unauthenticated);
    assert!(client.auth().user().is_none());
    assert!(client.auth().session().token.is_none());
    assert!(client.missions().user_missions().is_empty());
    assert_eq!(client.dashboard(), DashboardSummary::default());
}

#[tokio::test]
async fn test_restore_with_persisted_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .and(header("Authorization", "Bearer persisted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client(&server);
    store.set(TOKEN_KEY, "persisted-token").await.unwrap();

    let status = client.auth().restore().await;

    assert_eq!(status, SessionStatus::Authenticated);
    assert_eq!(client.auth().user().unwrap().email, "sari@example.com");
    assert_eq!(store.get(USER_ID_KEY).await.unwrap().as_deref(), Some("7"));
    assert!(client.notifier().pending().is_empty());
}

#[tokio::test]
async fn test_restore_discards_expired_token_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(0)
        .mount(&server)
        .await;

    let expired = encode(
        &Header::default(),
        &json!({ "sub": "7", "exp": 1_000_000_000 }),
        &EncodingKey::from_secret(b"server-secret"),
    )
    .unwrap();

    let (client, store) = client(&server);
    store.set(TOKEN_KEY, &expired).await.unwrap();

    assert_eq!(client.auth().restore().await, SessionStatus::Unauthenticated);
    assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_restore_without_token() {
    let server = MockServer::start().await;
    let (client, _store) = client(&server);

    assert_eq!(client.auth().restore().await, SessionStatus::Unauthenticated);
    assert!(!client.auth().is_loading());
}

#[tokio::test]
async fn test_update_user_merges_fields() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    let updated = client
        .auth()
        .update_user(json!({ "points": 200, "city": "Bandung" }))
        .unwrap()
        .unwrap();

    assert_eq!(updated.points, 200);
    assert_eq!(updated.name, "Sari");
    assert_eq!(updated.extra["city"], "Bandung");
    assert_eq!(client.auth().user().unwrap().points, 200);
}

#[tokio::test]
async fn test_fetch_profile_refreshes_user() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in(&server).await;

    let mut profile = user_json();
    profile["points"] = json!(450);
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile))
        .mount(&server)
        .await;

    let user = client.auth().fetch_profile().await.unwrap();

    assert_eq!(user.points, 450);
    assert_eq!(client.auth().user().unwrap().points, 450);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let (client, _store) = client(&server);
    assert_eq!(client.api().health().await.unwrap().status, "ok");
}
