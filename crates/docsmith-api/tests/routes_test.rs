//! HTTP route tests against a running server and a mock identity provider

use docsmith_api::{
    api::types::{
        AuthStatusResponse, AuthorizedResponse, CallbackResponse, HealthResponse, ResetResponse,
    },
    error::ErrorResponse,
    Config, Server,
};
use docsmith_auth::FlowState;
use reqwest::{header, redirect::Policy, Client, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestServer {
    base_url: String,
    token_path: PathBuf,
    http: Client,
    _shutdown: oneshot::Sender<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    async fn start(provider: &MockServer, force_https: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");

        let mut config = Config::default();
        config.server.force_https = force_https;
        config.oauth.client_id = "test-client".to_string();
        config.oauth.client_secret = "test-secret".to_string();
        config.oauth.authorization_endpoint = format!("{}/o/oauth2/auth", provider.uri());
        config.oauth.token_endpoint = format!("{}/token", provider.uri());
        config.oauth.redirect_uri = "http://localhost:5000/oauth2callback".to_string();
        config.session.cookie_secure = false;
        config.storage.token_path = token_path.clone();

        let server = Server::new(config).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(server.run_with_listener(listener, shutdown_rx));

        let http = Client::builder().redirect(Policy::none()).build().unwrap();

        Self {
            base_url: format!("http://{addr}"),
            token_path,
            http,
            _shutdown: shutdown_tx,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.http.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }
}

/// `name=value` pair from the session `Set-Cookie` header
fn session_cookie(response: &reqwest::Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().trim().to_string()
}

fn query_params(location: &str) -> HashMap<String, String> {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

async fn mount_token_endpoint(provider: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/documents",
            "token_type": "Bearer",
        })))
        .expect(expected_calls)
        .mount(provider)
        .await;
}

#[tokio::test]
async fn test_root_and_health() {
    let provider = MockServer::start().await;
    let server = TestServer::start(&provider, false).await;

    let root = server.get("/", None).await;
    assert_eq!(root.status(), StatusCode::OK);
    assert_eq!(root.text().await.unwrap(), "Docsmith backend is running");

    let health: HealthResponse = server.get("/health", None).await.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, docsmith_api::VERSION);
}

#[tokio::test]
async fn test_status_without_credential_sets_session_cookie() {
    let provider = MockServer::start().await;
    let server = TestServer::start(&provider, false).await;

    let response = server.get("/auth/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("docsmith_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let status: AuthStatusResponse = response.json().await.unwrap();
    assert!(!status.authorized);
    assert_eq!(status.state, FlowState::NoCredential);
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let provider = MockServer::start().await;
    let server = TestServer::start(&provider, false).await;

    let response = server.get("/auth/login", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with(&format!("{}/o/oauth2/auth?", provider.uri())));
    let params = query_params(location);
    assert_eq!(params["redirect_uri"], "http://localhost:5000/oauth2callback");
    assert_eq!(params["client_id"], "test-client");
    assert_eq!(params["access_type"], "offline");
    assert!(!params["state"].is_empty());
}

#[tokio::test]
async fn test_full_authorization_flow() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider, 1).await;
    let server = TestServer::start(&provider, false).await;

    let login = server.get("/auth/login", None).await;
    let cookie = session_cookie(&login);
    let location = login.headers()[header::LOCATION].to_str().unwrap().to_string();
    let state = query_params(&location)["state"].clone();

    let callback = server
        .get(
            &format!("/oauth2callback?state={state}&code=good-code"),
            Some(&cookie),
        )
        .await;
    assert_eq!(callback.status(), StatusCode::OK);
    let body: CallbackResponse = callback.json().await.unwrap();
    assert!(body.success);
    assert!(body.persisted);
    assert!(server.token_path.exists());

    // Any session now sees the shared credential
    let status: AuthStatusResponse = server.get("/auth/status", None).await.json().await.unwrap();
    assert!(status.authorized);
    assert_eq!(status.state, FlowState::Valid);

    // Login with a credential in place reports it instead of redirecting
    let login_again = server.get("/auth/login", Some(&cookie)).await;
    assert_eq!(login_again.status(), StatusCode::OK);
    let authorized: AuthorizedResponse = login_again.json().await.unwrap();
    assert!(authorized.authorized);
    assert!(authorized.persisted);
    assert!(authorized
        .scopes
        .contains(&"https://www.googleapis.com/auth/documents".to_string()));
}

#[tokio::test]
async fn test_status_polling_keeps_pending_attempt() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider, 1).await;
    let server = TestServer::start(&provider, false).await;

    let login = server.get("/auth/login", None).await;
    assert_eq!(login.status(), StatusCode::FOUND);
    let cookie = session_cookie(&login);
    let location = login.headers()[header::LOCATION].to_str().unwrap().to_string();
    let state = query_params(&location)["state"].clone();

    for _ in 0..2 {
        let status: AuthStatusResponse = server
            .get("/auth/status", Some(&cookie))
            .await
            .json()
            .await
            .unwrap();
        assert!(!status.authorized);
        assert_eq!(status.state, FlowState::AwaitingUserConsent);
    }

    let callback = server
        .get(
            &format!("/oauth2callback?state={state}&code=good-code"),
            Some(&cookie),
        )
        .await;
    assert_eq!(callback.status(), StatusCode::OK);
    let body: CallbackResponse = callback.json().await.unwrap();
    assert!(body.success);
    assert!(server.token_path.exists());
}

#[tokio::test]
async fn test_callback_state_mismatch() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider, 0).await;
    let server = TestServer::start(&provider, false).await;

    let login = server.get("/auth/login", None).await;
    let cookie = session_cookie(&login);

    let response = server
        .get("/oauth2callback?state=forged&code=anycode", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error.code, "DOCSMITH_API_STATE_MISMATCH");
    assert!(!server.token_path.exists());
}

#[tokio::test]
async fn test_callback_from_other_session_is_rejected() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider, 0).await;
    let server = TestServer::start(&provider, false).await;

    let login = server.get("/auth/login", None).await;
    let location = login.headers()[header::LOCATION].to_str().unwrap().to_string();
    let state = query_params(&location)["state"].clone();

    // No session cookie: the callback lands in a brand new session
    let response = server
        .get(&format!("/oauth2callback?state={state}&code=good-code"), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_missing_state() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider, 0).await;
    let server = TestServer::start(&provider, false).await;

    let login = server.get("/auth/login", None).await;
    let cookie = session_cookie(&login);

    let response = server.get("/oauth2callback?code=anycode", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_provider_error() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider, 0).await;
    let server = TestServer::start(&provider, false).await;

    let response = server
        .get(
            "/oauth2callback?error=access_denied&error_description=User%20denied",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error.code, "DOCSMITH_API_AUTHORIZATION_DENIED");
    assert!(body.error.message.contains("access_denied"));
}

#[tokio::test]
async fn test_reset_auth() {
    let provider = MockServer::start().await;
    let server = TestServer::start(&provider, false).await;

    let response = server
        .http
        .post(server.url("/reset-auth"))
        .send()
        .await
        .unwrap();
    let body: ResetResponse = response.json().await.unwrap();
    assert!(!body.success);
    assert_eq!(body.message, "No token file found to delete.");

    std::fs::write(
        &server.token_path,
        serde_json::to_vec(&json!({
            "access_token": "access",
            "expiry": "2099-01-01T00:00:00Z",
        }))
        .unwrap(),
    )
    .unwrap();

    let body: ResetResponse = server.get("/reset-auth", None).await.json().await.unwrap();
    assert!(body.success);
    assert_eq!(body.message, "Token file deleted. Please re-authenticate.");
    assert!(!server.token_path.exists());
}

#[tokio::test]
async fn test_corrupt_token_file_is_server_error() {
    let provider = MockServer::start().await;
    let server = TestServer::start(&provider, false).await;
    std::fs::write(&server.token_path, b"{ not json").unwrap();

    let response = server.get("/auth/status", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error.code, "DOCSMITH_API_STORAGE_ERROR");
}

#[tokio::test]
async fn test_force_https_redirect() {
    let provider = MockServer::start().await;
    let server = TestServer::start(&provider, true).await;

    let response = server
        .http
        .get(server.url("/health?probe=1"))
        .header("x-forwarded-proto", "http")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://127.0.0.1:"));
    assert!(location.ends_with("/health?probe=1"));

    let forwarded_https = server
        .http
        .get(server.url("/health"))
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();
    assert_eq!(forwarded_https.status(), StatusCode::OK);
}
