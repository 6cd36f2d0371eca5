//! Root endpoint: a form, or a branch lookup when the form was filled in.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::AppError;
use crate::render;
use crate::resolve::{BranchQuery, BranchTarget, Resolver};
use crate::routes::artifacts::present;

/// Creates the root router.
pub fn router(resolver: Arc<Resolver>) -> Router {
    Router::new().route("/", get(index)).with_state(resolver)
}

/// GET /?org=..&repo=..&workflow=..&branch=..&artifact=..
///
/// A complete query redirects to the canonical branch URL. Anything missing
/// shows the input form instead of an error.
async fn index(
    State(resolver): State<Arc<Resolver>>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<BranchQuery>,
) -> Result<Response, AppError> {
    match BranchTarget::try_from(query) {
        Ok(target) => present(&resolver, target.into(), false, uri.path()).await,
        Err(missing) => {
            tracing::debug!(%missing, "showing input form");
            Ok(render::input_form().into_response())
        }
    }
}
