use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors that can occur while looking up servers
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Failed to read server registry {0}: {1}")]
    Io(String, std::io::Error),
    #[error("Invalid server registry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A managed server that scope grants can be bound to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Server {
    /// Server identifier, as used in token scopes
    pub id: String,
    /// Display name
    pub name: String,
    /// Node hosting the server
    #[serde(default)]
    pub node: String,
}

/// Resolves server ids to servers
#[async_trait]
pub trait ServerLookup: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Server>, LookupError>;
}

/// Server lookup backed by a static list loaded at startup
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: HashMap<String, Server>,
}

impl ServerRegistry {
    pub fn new(servers: Vec<Server>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Load the registry from a JSON array of servers.
    /// A missing file yields an empty registry.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LookupError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(
                "Server registry {} does not exist, no servers will resolve",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| LookupError::Io(path.display().to_string(), e))?;
        let servers: Vec<Server> = serde_json::from_str(&contents)?;
        debug!("Read server registry from {}", path.display());
        Ok(Self::new(servers))
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[async_trait]
impl ServerLookup for ServerRegistry {
    async fn get(&self, id: &str) -> Result<Option<Server>, LookupError> {
        Ok(self.servers.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn server(id: &str) -> Server {
        Server {
            id: id.to_string(),
            name: format!("server-{}", id),
            node: "local".to_string(),
        }
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let registry = ServerRegistry::new(vec![server("42"), server("7")]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("42").await.unwrap(), Some(server("42")));
        assert_eq!(registry.get("13").await.unwrap(), None);
        assert_eq!(registry.get("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "panel-servers-{}-load.json",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"id": "42", "name": "survival", "node": "node-a"}}, {{"id": "7", "name": "creative"}}]"#
        )
        .unwrap();

        let registry = ServerRegistry::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(registry.len(), 2);
        let creative = registry.get("7").await.unwrap().unwrap();
        assert_eq!(creative.name, "creative");
        assert_eq!(creative.node, "");
    }

    #[test]
    fn test_load_missing_file() {
        let registry = ServerRegistry::load_from_file("/nonexistent/servers.json").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "panel-servers-{}-invalid.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").unwrap();

        let result = ServerRegistry::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(LookupError::Parse(_))));
    }
}
