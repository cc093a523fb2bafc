//! Bearer token claims and token validation

use crate::scope::{Scope, ScopeSet};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Resource id under which global scopes are granted
pub const GLOBAL_RESOURCE: &str = "";

/// Errors that can occur while validating a bearer token
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token was rejected: {0}")]
    Rejected(String),
    #[error("invalid token key: {0}")]
    Key(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Malformed(err.to_string()),
            _ => TokenError::Rejected(err.to_string()),
        }
    }
}

/// Trusted claims of a validated bearer token.
///
/// Fields are private: once a token has been parsed its claims cannot change.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
    exp: i64,
    /// Granted scopes keyed by resource id, `""` holding the global grants
    #[serde(default)]
    scopes: HashMap<String, Vec<Scope>>,
}

impl TokenClaims {
    pub fn new(
        subject: Option<String>,
        expires_at: i64,
        scopes: HashMap<String, Vec<Scope>>,
    ) -> Self {
        Self {
            sub: subject,
            exp: expires_at,
            scopes,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    /// Expiry as unix seconds
    pub fn expires_at(&self) -> i64 {
        self.exp
    }

    /// Effective scopes for `resource_id`: the grants for that resource plus the
    /// global grants. Missing entries contribute nothing.
    pub fn scopes_for(&self, resource_id: &str) -> ScopeSet {
        let mut set = ScopeSet::new();
        if let Some(granted) = self.scopes.get(resource_id) {
            set.extend(granted);
        }
        if resource_id != GLOBAL_RESOURCE {
            if let Some(global) = self.scopes.get(GLOBAL_RESOURCE) {
                set.extend(global);
            }
        }
        set
    }
}

/// Parses and validates bearer tokens into claims
#[async_trait]
pub trait TokenParser: Send + Sync {
    async fn parse(&self, token: &str) -> Result<TokenClaims, TokenError>;
}

/// JWT validation with a fixed verification key
pub struct JwtTokenParser {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenParser {
    /// HS256 tokens signed with a shared secret
    pub fn from_secret(secret: &[u8], audience: Option<&str>) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256, audience)
    }

    /// ES256 tokens verified with a PEM encoded public key
    pub fn from_ec_pem(pem: &[u8], audience: Option<&str>) -> Result<Self, TokenError> {
        let key = DecodingKey::from_ec_pem(pem).map_err(|e| TokenError::Key(e.to_string()))?;
        Ok(Self::new(key, Algorithm::ES256, audience))
    }

    fn new(key: DecodingKey, algorithm: Algorithm, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self { key, validation }
    }
}

#[async_trait]
impl TokenParser for JwtTokenParser {
    async fn parse(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)?;
        debug!(
            "Validated token for subject {:?} with grants on {} resource(s)",
            data.claims.subject(),
            data.claims.scopes.len()
        );
        Ok(data.claims)
    }
}
