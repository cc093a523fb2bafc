//! Permission scopes carried by bearer tokens and returned by the authorization server

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A named permission unit required to perform an operation.
///
/// Scopes travel as their dotted wire names (`servers.view`, `servers.sftp`, ...).
/// Names this build does not know deserialize to [`Scope::Unknown`], which is
/// never required by any operation and therefore never grants anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "servers.admin")]
    ServersAdmin,
    #[serde(rename = "servers.view")]
    ServersView,
    #[serde(rename = "servers.create")]
    ServersCreate,
    #[serde(rename = "servers.delete")]
    ServersDelete,
    #[serde(rename = "servers.edit")]
    ServersEdit,
    #[serde(rename = "servers.edit.admin")]
    ServersEditAdmin,
    #[serde(rename = "servers.edit.users")]
    ServersEditUsers,
    #[serde(rename = "servers.install")]
    ServersInstall,
    #[serde(rename = "servers.console")]
    ServersConsole,
    #[serde(rename = "servers.console.send")]
    ServersConsoleSend,
    #[serde(rename = "servers.start")]
    ServersStart,
    #[serde(rename = "servers.stop")]
    ServersStop,
    #[serde(rename = "servers.stats")]
    ServersStats,
    #[serde(rename = "servers.files")]
    ServersFiles,
    #[serde(rename = "servers.files.get")]
    ServersFilesGet,
    #[serde(rename = "servers.files.put")]
    ServersFilesPut,
    #[serde(rename = "servers.sftp")]
    ServersSftp,
    #[serde(rename = "nodes.view")]
    NodesView,
    #[serde(rename = "nodes.edit")]
    NodesEdit,
    #[serde(rename = "nodes.deploy")]
    NodesDeploy,
    #[serde(rename = "users.view")]
    UsersView,
    #[serde(rename = "users.edit")]
    UsersEdit,
    #[serde(rename = "templates.view")]
    TemplatesView,
    #[serde(rename = "settings.edit")]
    SettingsEdit,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl Scope {
    /// Wire name of the scope
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Login => "login",
            Scope::ServersAdmin => "servers.admin",
            Scope::ServersView => "servers.view",
            Scope::ServersCreate => "servers.create",
            Scope::ServersDelete => "servers.delete",
            Scope::ServersEdit => "servers.edit",
            Scope::ServersEditAdmin => "servers.edit.admin",
            Scope::ServersEditUsers => "servers.edit.users",
            Scope::ServersInstall => "servers.install",
            Scope::ServersConsole => "servers.console",
            Scope::ServersConsoleSend => "servers.console.send",
            Scope::ServersStart => "servers.start",
            Scope::ServersStop => "servers.stop",
            Scope::ServersStats => "servers.stats",
            Scope::ServersFiles => "servers.files",
            Scope::ServersFilesGet => "servers.files.get",
            Scope::ServersFilesPut => "servers.files.put",
            Scope::ServersSftp => "servers.sftp",
            Scope::NodesView => "nodes.view",
            Scope::NodesEdit => "nodes.edit",
            Scope::NodesDeploy => "nodes.deploy",
            Scope::UsersView => "users.view",
            Scope::UsersEdit => "users.edit",
            Scope::TemplatesView => "templates.view",
            Scope::SettingsEdit => "settings.edit",
            Scope::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective scopes of a caller for one request.
///
/// Built per request from the token claims and never shared between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet {
    scopes: HashSet<Scope>,
}

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every scope from `scopes` to the set
    pub fn extend<'a>(&mut self, scopes: impl IntoIterator<Item = &'a Scope>) {
        self.scopes
            .extend(scopes.into_iter().filter(|s| **s != Scope::Unknown));
    }

    /// Exact membership check
    pub fn contains(&self, scope: Scope) -> bool {
        scope != Scope::Unknown && self.scopes.contains(&scope)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Wire names in sorted order, for stable output
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.scopes.iter().map(Scope::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<'a> FromIterator<&'a Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = &'a Scope>>(iter: I) -> Self {
        let mut set = ScopeSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_wire_names() {
        assert_eq!(
            serde_json::to_string(&Scope::ServersSftp).unwrap(),
            "\"servers.sftp\""
        );
        let scope: Scope = serde_json::from_str("\"servers.console.send\"").unwrap();
        assert_eq!(scope, Scope::ServersConsoleSend);
        assert_eq!(scope.to_string(), "servers.console.send");
    }

    #[test]
    fn test_unknown_scope_name() {
        let scope: Scope = serde_json::from_str("\"servers.teleport\"").unwrap();
        assert_eq!(scope, Scope::Unknown);
    }

    #[test]
    fn test_contains_is_exact_membership() {
        let set: ScopeSet = [Scope::ServersConsoleSend].iter().collect();

        assert!(set.contains(Scope::ServersConsoleSend));
        // "servers.console" is a prefix of the granted scope, not a member
        assert!(!set.contains(Scope::ServersConsole));
    }

    #[test]
    fn test_unknown_never_granted() {
        let set: ScopeSet = [Scope::Unknown, Scope::Login].iter().collect();

        assert_eq!(set.len(), 1);
        assert!(!set.contains(Scope::Unknown));
        assert!(set.contains(Scope::Login));
    }

    #[test]
    fn test_names_sorted() {
        let set: ScopeSet = [Scope::ServersView, Scope::Login, Scope::ServersStart]
            .iter()
            .collect();
        assert_eq!(set.names(), vec!["login", "servers.start", "servers.view"]);
    }
}
