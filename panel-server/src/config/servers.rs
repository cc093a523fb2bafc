use serde::Deserialize;

/// Server registry configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServersConfig {
    /// JSON file listing the managed servers (default: servers.json)
    pub path: String,
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            path: "servers.json".to_string(),
        }
    }
}
