use crate::openapi::SERVERS_TAG;
use crate::servers::Server;
use axum::{response::IntoResponse, Extension, Json};
use panel_auth::ScopeSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Effective scopes of the caller
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct ScopesResult {
    /// Scope names, sorted
    scopes: Vec<String>,
}

impl From<&ScopeSet> for ScopesResult {
    fn from(scopes: &ScopeSet) -> Self {
        Self {
            scopes: scopes.names().into_iter().map(str::to_string).collect(),
        }
    }
}

/// A server together with the caller's scopes on it
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct ServerResult {
    server: Server,
    scopes: Vec<String>,
}

/// Scopes granted to the caller globally
#[utoipa::path(
    get,
    path = "/api/self/scopes",
    tag = SERVERS_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer token"),
    ),
    responses(
        (status = 200, description = "Caller scopes", body = ScopesResult),
        (status = 400, description = "Missing or malformed token"),
        (status = 403, description = "Invalid token or missing scope")
    )
)]
pub(crate) async fn self_scopes_handler(Extension(scopes): Extension<ScopeSet>) -> impl IntoResponse {
    Json(ScopesResult::from(&scopes))
}

/// Scopes granted to the caller on one server, global grants included
#[utoipa::path(
    get,
    path = "/api/servers/{id}/scopes",
    tag = SERVERS_TAG,
    params(
        ("id" = String, Path, description = "Server identifier"),
        ("Authorization" = String, Header, description = "Bearer token"),
    ),
    responses(
        (status = 200, description = "Caller scopes on the server", body = ScopesResult),
        (status = 400, description = "Missing or malformed token"),
        (status = 403, description = "Invalid token or missing scope")
    )
)]
pub(crate) async fn server_scopes_handler(
    Extension(scopes): Extension<ScopeSet>,
) -> impl IntoResponse {
    Json(ScopesResult::from(&scopes))
}

#[utoipa::path(
    get,
    path = "/api/servers/{id}",
    tag = SERVERS_TAG,
    params(
        ("id" = String, Path, description = "Server identifier"),
        ("Authorization" = String, Header, description = "Bearer token"),
    ),
    responses(
        (status = 200, description = "The server", body = ServerResult),
        (status = 400, description = "Missing or malformed token"),
        (status = 403, description = "Invalid token or missing scope"),
        (status = 404, description = "Unknown server"),
        (status = 500, description = "Internal server error")
    )
)]
pub(crate) async fn get_server_handler(
    Extension(server): Extension<Server>,
    Extension(scopes): Extension<ScopeSet>,
) -> impl IntoResponse {
    Json(ServerResult {
        server,
        scopes: ScopesResult::from(&scopes).scopes,
    })
}
