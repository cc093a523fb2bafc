use crate::config::PanelConfig;
use crate::create_app;
use crate::servers::{Server, ServerLookup, ServerRegistry};
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{header::AUTHORIZATION, Method, Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header};
use log::LevelFilter;
use panel_auth::JwtTokenParser;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Shared secret the fixture signs and verifies tokens with
const TEST_SECRET: &str = "panel-test-secret";

/// Test fixture wiring the full application around an in-memory server registry.
///
/// The registry holds server `"42"` (survival) and `"7"` (creative). Tokens for
/// requests are minted with [`TestFixture::token`].
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     let token = fixture.token(json!({ "42": ["servers.view"] }));
///
///     let response = fixture.get_with_token("/api/servers/42", &token).await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration settings
    pub config: PanelConfig,
}

impl TestFixture {
    pub async fn new() -> Self {
        let registry = ServerRegistry::new(vec![
            Server {
                id: "42".to_string(),
                name: "survival".to_string(),
                node: "node-a".to_string(),
            },
            Server {
                id: "7".to_string(),
                name: "creative".to_string(),
                node: "node-b".to_string(),
            },
        ]);
        Self::with_servers(Arc::new(registry)).await
    }

    /// Creates a fixture resolving servers through `servers`
    pub async fn with_servers(servers: Arc<dyn ServerLookup>) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let config = PanelConfig::for_test(TEST_SECRET, "/nonexistent/servers.json");
        let tokens = Arc::new(JwtTokenParser::from_secret(TEST_SECRET.as_bytes(), None));
        let state = AppState::with_parts(config.clone(), tokens, servers);
        let app = create_app(state).await;

        Self { app, config }
    }

    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Signs a token valid for an hour carrying the given scope map.
    ///
    /// `scopes` maps server ids to scope names, `""` holding global grants.
    pub fn token(&self, scopes: Value) -> String {
        let claims = json!({
            "sub": "test-user",
            "exp": chrono::Utc::now().timestamp() + 3600,
            "scopes": scopes,
        });
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.token.secret.as_bytes()),
        )
        .expect("Failed to sign token")
    }

    /// Sends a GET request authorized with `Authorization: Bearer <token>`
    pub async fn get_with_token(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.as_ref())
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and returns a TestResponse.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| json!({}))
        } else {
            json!({})
        };

        TestResponse {
            status,
            json,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

/// Response from a test request that provides convenient access to status and JSON body.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
    /// Raw response body
    pub body: String,
}

impl TestResponse {
    /// Asserts that the response has the expected status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match the expected value.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {} but got {} with body: {}",
            expected, self.status, self.body
        );
        self
    }

    /// Asserts that the response status is OK (200).
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Converts the response body to the specified type.
    ///
    /// # Panics
    ///
    /// Panics if deserialization fails.
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}
