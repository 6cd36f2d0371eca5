//! artifact-dl server
//!
//! Resolves a human-friendly description of a CI build artifact
//! (organization, repository, workflow, branch, artifact name) into a direct
//! download link, and serves every intermediate link as a redirect or an
//! HTML list.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod links;
pub mod models;
pub mod render;
pub mod resolve;
pub mod routes;

use std::sync::Arc;

pub use config::ServerConfig;
pub use error::{AppError, ClientError, ResolveError};
pub use resolve::{Resolver, Target};
pub use routes::create_router;

/// Wires the upstream client, links and stage caches described by `config`.
pub fn build_resolver(config: &ServerConfig) -> Result<Arc<Resolver>, ClientError> {
    let api = github::GitHubClient::new(config.api_base.clone(), &config.token)?;
    let links = links::Links::new(config.prefix.clone(), config.web_base.clone());
    Ok(Arc::new(Resolver::new(Arc::new(api), links, config.caches)))
}

/// The full application router for `config`.
pub fn build_app(config: &ServerConfig) -> Result<axum::Router, ClientError> {
    let resolver = build_resolver(config)?;
    Ok(create_router(resolver, &config.prefix))
}
