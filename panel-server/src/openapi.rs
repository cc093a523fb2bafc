use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const SERVERS_TAG: &str = "Servers API";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health::health_check,
        crate::api::servers::self_scopes_handler,
        crate::api::servers::server_scopes_handler,
        crate::api::servers::get_server_handler,
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = SERVERS_TAG, description = "Scope protected server endpoints"),
    ),
    info(
        title = "Panel API",
        description = "Game server panel API",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
