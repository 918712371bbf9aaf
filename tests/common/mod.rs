use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use gmail_auth::AuthConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const GOOD_CODE: &str = "abc123";
#[allow(dead_code)]
pub const REJECTED_CODE: &str = "expired-code";

/// A loopback port that was free a moment ago.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[allow(dead_code)]
pub fn write_registration(dir: &Path, redirect_uri: &str) {
    let doc = serde_json::json!({
        "installed": {
            "client_id": "test-client.apps.googleusercontent.com",
            "client_secret": "test-secret",
            "redirect_uris": [redirect_uri]
        }
    });
    std::fs::write(
        dir.join("credentials.json"),
        serde_json::to_string_pretty(&doc).unwrap(),
    )
    .unwrap();
}

#[allow(dead_code)]
pub fn write_token(dir: &Path, token: serde_json::Value) {
    std::fs::write(
        dir.join("token.json"),
        serde_json::to_string_pretty(&token).unwrap(),
    )
    .unwrap();
}

/// Config rooted in `dir`, talking to a mock token endpoint, never opening a browser.
#[allow(dead_code)]
pub fn test_config(dir: &Path, token_server: &MockServer) -> AuthConfig {
    AuthConfig {
        token_endpoint: format!("{}/token", token_server.uri()),
        callback_timeout: Some(Duration::from_secs(10)),
        open_browser: false,
        headless: false,
        ..AuthConfig::default()
    }
    .with_config_dir(dir)
}

/// Mock token endpoint: accepts `abc123`, rejects `expired-code`, and
/// refreshes without rotating the refresh token.
#[allow(dead_code)]
pub async fn start_token_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={GOOD_CODE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.exchanged",
            "refresh_token": "1//exchanged-refresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.readonly",
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("code={REJECTED_CODE}")))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&server)
        .await;

    server
}

#[allow(dead_code)]
pub async fn mount_refresh_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_refresh_revoked(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(server)
        .await;
}

/// Connect, retrying while the listener is still starting up.
#[allow(dead_code)]
pub async fn connect_with_retry(addr: SocketAddr) -> TcpStream {
    for _ in 0..200 {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("nothing listening on {addr}");
}

/// Send a GET for `target` and return the raw HTTP response.
#[allow(dead_code)]
pub async fn send_get(addr: SocketAddr, target: &str) -> String {
    let mut stream = connect_with_retry(addr).await;
    let request = format!("GET {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}
