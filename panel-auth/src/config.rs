use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Path of the OAuth token endpoint on the authorization server
pub const TOKEN_ENDPOINT: &str = "/oauth2/token";

/// Connection settings for the remote authorization server
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthServerConfig {
    /// Base URL of the authorization server (default: http://localhost:8080)
    pub url: String,

    /// Client id this process authenticates itself with
    pub client_id: String,

    /// Client secret this process authenticates itself with
    pub client_secret: String,

    /// Request timeout for calls to the authorization server in seconds (default: 10)
    pub timeout: u64,

    /// Refresh the service token this many seconds before it expires (default: 60)
    pub refresh_margin: u64,
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout: 10,
            refresh_margin: 60,
        }
    }
}

impl AuthServerConfig {
    /// Full URL of the token endpoint
    pub fn token_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}{}",
            self.url.trim_end_matches('/'),
            TOKEN_ENDPOINT
        ))
    }

    /// HTTP client used for every call to the authorization server
    pub fn create_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .connect_timeout(Duration::from_secs(2))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }
}
