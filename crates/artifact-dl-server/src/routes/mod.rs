//! HTTP routes for the artifact-dl server.

pub mod artifacts;
pub mod index;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::resolve::Resolver;

/// Creates the main router, mounted under `prefix` (empty for the root).
pub fn create_router(resolver: Arc<Resolver>, prefix: &str) -> Router {
    let routes = Router::new()
        .merge(index::router(resolver.clone()))
        .merge(artifacts::router(resolver));

    let app = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    };
    app.layer(TraceLayer::new_for_http())
}
