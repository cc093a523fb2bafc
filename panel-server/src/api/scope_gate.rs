//! Bearer token scope enforcement for protected routes

use crate::errors::ApiError;
use crate::servers::LookupError;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Path, Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use http::header::AUTHORIZATION;
use http::StatusCode;
use log::{debug, error, warn};
use panel_auth::{Scope, TokenError};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

/// Query parameter accepted when no `Authorization` header is sent
const ACCESS_TOKEN_PARAM: &str = "accessToken";

/// Path parameter naming the addressed server
const SERVER_ID_PARAM: &str = "id";

#[derive(Debug, Error)]
pub(crate) enum GateError {
    #[error("missing access token")]
    MissingAccessToken,
    #[error("not a bearer token")]
    NotBearerToken,
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("missing scope {0}")]
    MissingScope(Scope),
    #[error("server not found")]
    ServerNotFound,
    #[error("server lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            GateError::MissingAccessToken => {
                ApiError::bad_request("missing_access_token", self).into_response()
            }
            GateError::NotBearerToken => {
                ApiError::bad_request("not_bearer_token", self).into_response()
            }
            GateError::InvalidToken(_) => ApiError::forbidden("invalid_token", self).into_response(),
            GateError::MissingScope(_) => ApiError::forbidden("missing_scope", self).into_response(),
            GateError::ServerNotFound => StatusCode::NOT_FOUND.into_response(),
            GateError::Lookup(e) => {
                error!("Error handling auth check: {}", e);
                ApiError::internal("internal server error").into_response()
            }
        }
    }
}

/// The scope a route requires, and whether it addresses a single server
#[derive(Clone)]
pub(crate) struct ScopeRequirement {
    state: AppState,
    scope: Scope,
    needs_server: bool,
}

impl ScopeRequirement {
    pub(crate) fn new(state: &AppState, scope: Scope) -> Self {
        Self {
            state: state.clone(),
            scope,
            needs_server: false,
        }
    }

    /// Also resolve the `{id}` server and attach it to the request
    pub(crate) fn with_server(mut self) -> Self {
        self.needs_server = true;
        self
    }
}

/// Middleware enforcing a [`ScopeRequirement`].
///
/// On success the request continues with the caller's [`panel_auth::ScopeSet`]
/// (and the [`crate::servers::Server`] when required) in its extensions.
/// Every other outcome, a panic included, is answered here.
pub(crate) async fn enforce_scope(
    State(requirement): State<ScopeRequirement>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = AssertUnwindSafe(authorize(&requirement, request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(request)) => next.run(request).await,
        Ok(Err(err)) => {
            warn!("Rejected request requiring {}: {}", requirement.scope, err);
            err.into_response()
        }
        Err(panic) => {
            error!("Error handling auth check: {}", panic_message(&*panic));
            ApiError::internal("internal server error").into_response()
        }
    }
}

async fn authorize(requirement: &ScopeRequirement, request: Request) -> Result<Request, GateError> {
    let token = extract_token(&request)?;
    let claims = requirement.state.tokens.parse(&token).await?;

    let (mut parts, body) = request.into_parts();
    let server_id = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|Path(mut params)| params.remove(SERVER_ID_PARAM))
        .unwrap_or_default();

    let scopes = claims.scopes_for(&server_id);
    if !scopes.contains(requirement.scope) {
        return Err(GateError::MissingScope(requirement.scope));
    }

    if requirement.needs_server {
        let server = requirement
            .state
            .servers
            .get(&server_id)
            .await?
            .ok_or(GateError::ServerNotFound)?;
        parts.extensions.insert(server);
    }

    debug!(
        "Authorized {} for {} on '{}'",
        claims.subject().unwrap_or("anonymous"),
        requirement.scope,
        server_id
    );
    parts.extensions.insert(scopes);
    Ok(Request::from_parts(parts, body))
}

/// Token from `Authorization: Bearer <token>`, or from the `accessToken` query
/// parameter when no header is sent
fn extract_token(request: &Request) -> Result<String, GateError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| GateError::NotBearerToken)?),
        None => None,
    };

    match header.filter(|value| !value.is_empty()) {
        Some(value) => {
            let mut parts = value.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some("Bearer"), Some(token), None) => Ok(token.to_string()),
                _ => Err(GateError::NotBearerToken),
            }
        }
        None => Query::<HashMap<String, String>>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(mut query)| query.remove(ACCESS_TOKEN_PARAM))
            .filter(|token| !token.is_empty())
            .ok_or(GateError::MissingAccessToken),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
