//! The bearer credential this process uses to call the authorization server

use crate::clock::{Clock, SystemClock};
use crate::config::AuthServerConfig;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, warn};
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Lifetime assumed when the token response omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Upper bound for the configured refresh margin
const MAX_REFRESH_MARGIN_SECS: u64 = 24 * 3600;

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Errors that can occur while obtaining a service token
#[derive(Debug, Error)]
pub enum ServiceTokenError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authorization server responded with status {0}: {1}")]
    Status(u16, String),
    #[error("Invalid token response: {0}")]
    Decode(String),
    #[error("Invalid authorization server URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
struct ServiceCredential {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Shared cache of the service credential.
///
/// The credential is fetched lazily with a client-credentials grant and lives
/// only in memory. Reads take the read lock just long enough to clone the
/// token. Installs replace the whole value under the write lock; the network
/// exchange itself runs outside of it, serialized by `refresh_lock`.
pub struct ServiceTokenCache {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    clock: Arc<dyn Clock>,
    credential: RwLock<Option<ServiceCredential>>,
    refresh_lock: Mutex<()>,
}

impl ServiceTokenCache {
    pub fn new(client: Client, config: &AuthServerConfig) -> Result<Self, ServiceTokenError> {
        Ok(Self {
            client,
            token_url: config.token_url()?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_margin: Duration::seconds(
                config.refresh_margin.min(MAX_REFRESH_MARGIN_SECS) as i64,
            ),
            clock: Arc::new(SystemClock),
            credential: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Replace the clock used for staleness checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The cached token, if one has been obtained. Never touches the network.
    pub async fn current(&self) -> Option<String> {
        self.credential
            .read()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    /// Obtain a new token if none is cached or the cached one is about to expire
    pub async fn refresh_if_stale(&self) -> Result<(), ServiceTokenError> {
        if !self.is_stale().await {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        if !self.is_stale().await {
            return Ok(());
        }
        self.refresh().await
    }

    /// Obtain a new token regardless of the cached one.
    ///
    /// Used after the authorization server rejected a token that still looked
    /// valid locally. Returns whether a new token was installed.
    pub async fn force_refresh(&self) -> bool {
        let _guard = self.refresh_lock.lock().await;
        match self.refresh().await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to refresh service token: {}", e);
                false
            }
        }
    }

    async fn is_stale(&self) -> bool {
        match self.credential.read().await.as_ref() {
            Some(credential) => self
                .clock
                .now()
                .checked_add_signed(self.refresh_margin)
                .is_none_or(|deadline| deadline >= credential.expires_at),
            None => true,
        }
    }

    async fn refresh(&self) -> Result<(), ServiceTokenError> {
        let credential = self.exchange().await?;
        debug!(
            "Installed service token for client '{}', expires at {}",
            self.client_id, credential.expires_at
        );
        *self.credential.write().await = Some(credential);
        Ok(())
    }

    async fn exchange(&self) -> Result<ServiceCredential, ServiceTokenError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish();

        let issued_at = self.clock.now();
        let response = self
            .client
            .post(self.token_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "Service token request for client '{}' failed with status {}",
                self.client_id, status
            );
            return Err(ServiceTokenError::Status(status.as_u16(), error_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceTokenError::Decode(e.to_string()))?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ServiceTokenError::Decode(format!("expires_in out of range: {}", lifetime))
            })?;
        Ok(ServiceCredential {
            access_token: token.access_token,
            expires_at,
        })
    }
}
