//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main router: the admission endpoint, health and metrics at the
/// root, and the lifecycle API under `/api/v1`.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Expansion templates
        .route("/expansions", get(handlers::list_expansions))
        .route(
            "/expansions/:name",
            put(handlers::upsert_expansion).delete(handlers::delete_expansion),
        )
        // Policy templates
        .route(
            "/templates/:name",
            get(handlers::get_template)
                .put(handlers::upsert_template)
                .delete(handlers::delete_template),
        )
        // Constraints
        .route(
            "/constraints/:kind/:name",
            put(handlers::upsert_constraint).delete(handlers::delete_constraint),
        )
        // Namespace cache
        .route(
            "/namespaces/:name",
            put(handlers::upsert_namespace).delete(handlers::delete_namespace),
        )
        // Debugging
        .route("/dump", get(handlers::dump));

    let router = Router::new()
        .route("/v1/admit", post(handlers::admit))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TraceLayer::new_for_http());

    let router = if server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
