use axum::Router;
use topo::domain::constants::{CLASSIFICATION_TAG, SYSTEM_TAG};
use topo::kernel::server::ApiState;
use topo::server::router::{classification_router, system_router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    info(title = "Topology classification service"),
    tags(
        (name = SYSTEM_TAG, description = "Liveness and readiness"),
        (name = CLASSIFICATION_TAG, description = "Object classification management"),
    )
)]
struct ApiDoc;

/// The full HTTP surface: system routes, the classification slice and the Scalar UI at `/api`.
pub fn init(state: ApiState) -> Router {
    let api = ApiDoc::openapi();

    // Separate the OpenAPI routes and the API documentation object
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(api)
        .merge(system_router())
        .merge(classification_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    Router::new().merge(openapi_routes).merge(scalar_routes)
}
