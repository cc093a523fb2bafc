//! Password-grant validation of SFTP logins against the authorization server

use crate::config::AuthServerConfig;
use crate::scope::Scope;
use crate::service_token::{FORM_CONTENT_TYPE, ServiceTokenCache, ServiceTokenError};
use log::{debug, error, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// How many times a rejected service token is refreshed before giving up
const MAX_CREDENTIAL_RETRIES: usize = 1;

/// Scope requested in the password grant
const SFTP_GRANT_SCOPE: &str = "sftp";

/// Key of the bound server id in SSH permission extensions
pub const SERVER_ID_EXTENSION: &str = "server_id";

/// Errors returned to the SSH front end.
///
/// Neither variant carries upstream status or body; those are only logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SftpAuthError {
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("invalid response from authorization server")]
    Upstream,
}

/// A successful SFTP login, bound to exactly one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpGrant {
    server_id: String,
}

impl SftpGrant {
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The grant as SSH permission extensions
    pub fn extensions(&self) -> HashMap<String, String> {
        HashMap::from([(SERVER_ID_EXTENSION.to_string(), self.server_id.clone())])
    }
}

/// Validates SFTP username/password pairs by delegating to the authorization server
#[derive(Clone)]
pub struct SftpAuthorization {
    client: Client,
    token_url: Url,
    tokens: Arc<ServiceTokenCache>,
}

impl SftpAuthorization {
    pub fn new(client: Client, token_url: Url, tokens: Arc<ServiceTokenCache>) -> Self {
        Self {
            client,
            token_url,
            tokens,
        }
    }

    /// Build the validator and its service token cache from configuration
    pub fn from_config(config: &AuthServerConfig) -> Result<Self, ServiceTokenError> {
        let client = config.create_client()?;
        let tokens = ServiceTokenCache::new(client.clone(), config)?;
        Ok(Self::new(client, config.token_url()?, Arc::new(tokens)))
    }

    /// The shared service token cache
    pub fn tokens(&self) -> &Arc<ServiceTokenCache> {
        &self.tokens
    }

    /// Check `username`/`password` and resolve the server they unlock
    pub async fn validate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SftpGrant, SftpAuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("username", username)
            .append_pair("password", password)
            .append_pair("scope", SFTP_GRANT_SCOPE)
            .finish();

        let mut retries = 0;
        loop {
            if let Err(e) = self.tokens.refresh_if_stale().await {
                warn!("Could not refresh service token before SFTP login: {}", e);
            }

            let response = self.send(&body).await.map_err(|e| {
                error!("Error talking to authorization server: {}", e);
                SftpAuthError::Upstream
            })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && retries < MAX_CREDENTIAL_RETRIES {
                retries += 1;
                debug!("Service token rejected by authorization server, refreshing");
                if self.tokens.force_refresh().await {
                    continue;
                }
            }

            if status != StatusCode::OK {
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "Error talking to authorization server: [{}] [{}]",
                    status, error_text
                );
                return Err(SftpAuthError::Upstream);
            }

            let payload: serde_json::Map<String, serde_json::Value> =
                response.json().await.map_err(|e| {
                    error!("Invalid token response from authorization server: {}", e);
                    SftpAuthError::Upstream
                })?;

            return match grant_from_response(&payload) {
                Some(grant) => {
                    debug!(
                        "SFTP login for '{}' bound to server {}",
                        username, grant.server_id
                    );
                    Ok(grant)
                }
                None => {
                    debug!("SFTP login for '{}' rejected", username);
                    Err(SftpAuthError::InvalidCredentials)
                }
            };
        }
    }

    async fn send(&self, body: &str) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .client
            .post(self.token_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(CONTENT_LENGTH, body.len())
            .body(body.to_string());

        if let Some(token) = self.tokens.current().await {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        request.send().await
    }
}

/// Resolve the grant from a decoded token response.
///
/// The first `<server id>:servers.sftp` entry in server order wins; entries
/// that are not exactly `id:scope` are skipped.
fn grant_from_response(
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Option<SftpGrant> {
    if payload.get("error").is_some_and(|e| !e.is_null()) {
        return None;
    }

    let scopes = payload.get("scope")?.as_str()?;
    scopes
        .split(' ')
        .filter_map(|entry| {
            let mut parts = entry.split(':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(scope), None) => Some((id, scope)),
                _ => None,
            }
        })
        .find(|(_, scope)| *scope == Scope::ServersSftp.as_str())
        .map(|(id, _)| SftpGrant {
            server_id: id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().expect("payload must be an object")
    }

    #[test]
    fn test_first_sftp_scope_wins() {
        let grant = grant_from_response(&payload(json!({
            "scope": "7:servers.start 42:servers.sftp 9:servers.sftp"
        })))
        .expect("Should bind a server");

        assert_eq!(grant.server_id(), "42");
    }

    #[test]
    fn test_error_field_rejects() {
        let grant = grant_from_response(&payload(json!({
            "error": "invalid_grant",
            "scope": "42:servers.sftp"
        })));
        assert!(grant.is_none());
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let grant = grant_from_response(&payload(json!({
            "scope": "servers.sftp a:b:servers.sftp  login 5:servers.sftp"
        })))
        .expect("Should bind a server");

        assert_eq!(grant.server_id(), "5");
    }

    #[test]
    fn test_scope_name_must_match_exactly() {
        let grant = grant_from_response(&payload(json!({
            "scope": "42:servers.sftp.extra 7:sftp"
        })));
        assert!(grant.is_none());
    }

    #[test]
    fn test_missing_or_non_string_scope() {
        assert!(grant_from_response(&payload(json!({}))).is_none());
        assert!(grant_from_response(&payload(json!({ "scope": 42 }))).is_none());
    }

    #[test]
    fn test_grant_extensions() {
        let grant = SftpGrant {
            server_id: "42".to_string(),
        };
        let extensions = grant.extensions();
        assert_eq!(extensions.len(), 1);
        assert_eq!(
            extensions.get(SERVER_ID_EXTENSION).map(String::as_str),
            Some("42")
        );
    }

    #[test]
    fn test_error_messages_are_generic() {
        assert_eq!(
            SftpAuthError::InvalidCredentials.to_string(),
            "incorrect username or password"
        );
        assert_eq!(
            SftpAuthError::Upstream.to_string(),
            "invalid response from authorization server"
        );
    }
}
