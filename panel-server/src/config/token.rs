use panel_auth::{JwtTokenParser, TokenError};
use serde::Deserialize;

/// Bearer token verification settings
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared secret for HS256 signed tokens
    pub secret: String,

    /// Path to a PEM encoded ES256 public key, preferred over `secret` when set
    pub public_key: String,

    /// Required `aud` claim, not checked when empty
    pub audience: String,
}

impl TokenConfig {
    /// Build the token parser described by this configuration
    pub fn create_parser(&self) -> Result<JwtTokenParser, TokenError> {
        let audience = (!self.audience.is_empty()).then_some(self.audience.as_str());

        if !self.public_key.is_empty() {
            let pem = std::fs::read(&self.public_key).map_err(|e| {
                TokenError::Key(format!("failed to read {}: {}", self.public_key, e))
            })?;
            return JwtTokenParser::from_ec_pem(&pem, audience);
        }

        if self.secret.is_empty() {
            return Err(TokenError::Key(
                "either token.public_key or token.secret must be set".to_string(),
            ));
        }
        Ok(JwtTokenParser::from_secret(self.secret.as_bytes(), audience))
    }
}
