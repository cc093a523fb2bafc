pub(crate) mod health;
pub(crate) mod scope_gate;
pub(crate) mod servers;

use crate::api::scope_gate::{enforce_scope, ScopeRequirement};
use crate::state::AppState;
use axum::{middleware, routing::get, Router};
use panel_auth::Scope;

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(protected_routes(state))
}

/// Routes behind bearer token scope checks.
///
/// Each route carries its own requirement, so the gate is added with
/// `route_layer` after the route has matched and its path parameters are known.
fn protected_routes(state: &AppState) -> Router<AppState> {
    let login = ScopeRequirement::new(state, Scope::Login);
    let view_scopes = ScopeRequirement::new(state, Scope::ServersView);
    let view_server = ScopeRequirement::new(state, Scope::ServersView).with_server();

    Router::new()
        .route(
            "/api/self/scopes",
            get(servers::self_scopes_handler)
                .route_layer(middleware::from_fn_with_state(login, enforce_scope)),
        )
        .route(
            "/api/servers/{id}",
            get(servers::get_server_handler)
                .route_layer(middleware::from_fn_with_state(view_server, enforce_scope)),
        )
        .route(
            "/api/servers/{id}/scopes",
            get(servers::server_scopes_handler)
                .route_layer(middleware::from_fn_with_state(view_scopes, enforce_scope)),
        )
}
