//! Interceptor behaviour against a mock server.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures_util::future::join_all;
use reqwest::Method;
use serde_json::json;
use time::OffsetDateTime;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate_client::{AccessCredential, AuthenticatedClient, ClientConfig, ClientError, SessionEvent};

fn jwt(name: &str, expires_in: i64) -> String {
    let exp = (OffsetDateTime::now_utc() + time::Duration::seconds(expires_in)).unix_timestamp();
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{name}","exp":{exp}}}"#))
    )
}

fn token_body(token: &str) -> serde_json::Value {
    json!({ "access_token": token, "token_type": "Bearer", "expires_in": 900 })
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn client(server: &MockServer) -> AuthenticatedClient {
    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    AuthenticatedClient::new(config).unwrap()
}

#[tokio::test]
async fn test_rejected_request_refreshes_once_and_retries() {
    let server = MockServer::start().await;
    let old = jwt("old", 900);
    let new = jwt("new", 900);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&new)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", bearer(&new).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client
        .coordinator()
        .set_credential(AccessCredential::from_token(old.clone()).unwrap());

    let response = client
        .send(client.request(Method::GET, "/api/data").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(client.coordinator().current().unwrap().token(), new);
}

#[tokio::test]
async fn test_second_rejection_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&jwt("new", 900))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    client
        .coordinator()
        .set_credential(AccessCredential::from_token(jwt("old", 900)).unwrap());
    let mut events = client.coordinator().subscribe();

    let result = client
        .send(client.request(Method::GET, "/api/data").unwrap())
        .await;

    assert!(matches!(result, Err(ClientError::Unauthorized { .. })));
    assert!(client.coordinator().current().is_none());

    // The refresh succeeded before the retry was rejected.
    assert!(matches!(events.recv().await, Ok(SessionEvent::Refreshed { .. })));
    assert!(matches!(events.recv().await, Ok(SessionEvent::Invalidated { .. })));
}

#[tokio::test]
async fn test_auth_endpoints_never_trigger_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = client
        .send(client.request(Method::POST, "/auth/refresh").unwrap())
        .await;

    assert!(matches!(result, Err(ClientError::Unauthorized { .. })));
    assert_eq!(client.coordinator().state_name(), "empty");
}

#[tokio::test]
async fn test_concurrent_expired_requests_share_one_refresh() {
    let server = MockServer::start().await;
    let new = jwt("new", 900);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&new))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", bearer(&new).as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(10)
        .mount(&server)
        .await;

    let client = client(&server);
    client
        .coordinator()
        .set_credential(AccessCredential::from_token(jwt("old", -60)).unwrap());

    let responses = join_all((0..10).map(|_| {
        let client = client.clone();
        async move {
            client
                .send(client.request(Method::GET, "/api/data").unwrap())
                .await
        }
    }))
    .await;

    for response in responses {
        assert_eq!(response.unwrap().status(), 200);
    }
}

#[tokio::test]
async fn test_login_installs_credential() {
    let server = MockServer::start().await;
    let issued = jwt("alice", 900);

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&issued)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let credential = client.login("alice", "correct horse").await.unwrap();

    assert_eq!(credential.token(), issued);
    assert_eq!(client.coordinator().current().unwrap().token(), issued);
}

#[tokio::test]
async fn test_rejected_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_credentials",
            "error_description": "Invalid username or password"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let result = client.login("alice", "wrong").await;

    assert_eq!(
        result.unwrap_err(),
        ClientError::unauthorized("Invalid username or password")
    );
}

#[tokio::test]
async fn test_refresh_without_cookie_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut events = client.coordinator().subscribe();

    let result = client
        .send(client.request(Method::GET, "/api/data").unwrap())
        .await;

    assert_eq!(result.unwrap_err(), ClientError::MissingCredential);
    assert!(matches!(events.recv().await, Ok(SessionEvent::Invalidated { .. })));
}

#[tokio::test]
async fn test_logout_clears_session_even_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client
        .coordinator()
        .set_credential(AccessCredential::from_token(jwt("alice", 900)).unwrap());
    let mut events = client.coordinator().subscribe();

    let result = client.logout().await;

    assert!(matches!(
        result,
        Err(ClientError::UnexpectedStatus { status: 500, .. })
    ));
    assert!(client.coordinator().current().is_none());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
}
