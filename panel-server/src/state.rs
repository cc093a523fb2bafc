use crate::config::PanelConfig;
use crate::servers::{LookupError, ServerLookup, ServerRegistry};
use log::{info, warn};
use panel_auth::{TokenError, TokenParser};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building the application state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to create token parser: {0}")]
    Token(#[from] TokenError),
    #[error("Failed to load server registry: {0}")]
    Servers(#[from] LookupError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PanelConfig>,
    pub tokens: Arc<dyn TokenParser>,
    pub servers: Arc<dyn ServerLookup>,
}

impl AppState {
    pub fn new(config: PanelConfig) -> Result<Self, StateError> {
        let tokens = config.token.create_parser()?;
        let servers = ServerRegistry::load_from_file(&config.servers.path)?;
        if servers.is_empty() {
            warn!("No servers registered, server routes will answer 404");
        } else {
            info!("Serving {} registered server(s)", servers.len());
        }
        Ok(Self::with_parts(config, Arc::new(tokens), Arc::new(servers)))
    }

    /// Build the state around already constructed collaborators
    pub fn with_parts(
        config: PanelConfig,
        tokens: Arc<dyn TokenParser>,
        servers: Arc<dyn ServerLookup>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tokens,
            servers,
        }
    }
}
