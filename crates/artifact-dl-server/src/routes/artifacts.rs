//! Artifact endpoints at every granularity.
//!
//! A trailing `.zip` on the last segment asks for a straight redirect to the
//! archive; without it the canonical request gets the list of links.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::AppError;
use crate::render;
use crate::resolve::{ArtifactTarget, BranchTarget, Resolver, RunTarget, Target};

/// Suffix that selects the direct redirect.
const ZIP_SUFFIX: &str = ".zip";

/// Creates the artifacts router.
pub fn router(resolver: Arc<Resolver>) -> Router {
    Router::new()
        .route("/{org}/{repo}/{artifact_id}", get(by_artifact))
        .route("/{org}/{repo}/{run_id}/{artifact}", get(by_run))
        .route("/{org}/{repo}/{workflow}/{branch}/{artifact}", get(by_branch))
        .with_state(resolver)
}

/// GET /{org}/{repo}/{workflow}/{branch}/{artifact}[.zip]
async fn by_branch(
    State(resolver): State<Arc<Resolver>>,
    OriginalUri(uri): OriginalUri,
    Path((org, repo, workflow, branch, artifact)): Path<(String, String, String, String, String)>,
) -> Result<Response, AppError> {
    let (artifact, zip) = split_zip(artifact);
    let target = BranchTarget {
        org,
        repo,
        workflow,
        branch,
        artifact,
    };
    present(&resolver, target.into(), zip, uri.path()).await
}

/// GET /{org}/{repo}/{run_id}/{artifact}[.zip]
async fn by_run(
    State(resolver): State<Arc<Resolver>>,
    OriginalUri(uri): OriginalUri,
    Path((org, repo, run_id, artifact)): Path<(String, String, String, String)>,
) -> Result<Response, AppError> {
    let (artifact, zip) = split_zip(artifact);
    let target = RunTarget {
        org,
        repo,
        run_id: parse_id("run id", &run_id)?,
        artifact,
    };
    present(&resolver, target.into(), zip, uri.path()).await
}

/// GET /{org}/{repo}/{artifact_id}[.zip]
async fn by_artifact(
    State(resolver): State<Arc<Resolver>>,
    OriginalUri(uri): OriginalUri,
    Path((org, repo, artifact_id)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let (artifact_id, zip) = split_zip(artifact_id);
    let target = ArtifactTarget {
        org,
        repo,
        artifact_id: parse_id("artifact id", &artifact_id)?,
    };
    present(&resolver, target.into(), zip, uri.path()).await
}

/// Render `target` for a request to `request_path`.
///
/// Direct requests resolve the whole chain and redirect to its last link.
/// Listing requests are first sent to the canonical URL of the target, which
/// is known without asking upstream; only the canonical request resolves.
/// A non-canonical URL for a run or artifact that does not exist therefore
/// answers with a redirect, and the error surfaces at the canonical URL.
pub async fn present(
    resolver: &Resolver,
    target: Target,
    zip: bool,
    request_path: &str,
) -> Result<Response, AppError> {
    if zip {
        let urls = resolver.resolve(&target).await?;
        return render::direct(&urls);
    }

    let canonical = target.canonical_url(resolver.links());
    if request_path != canonical {
        tracing::debug!(request_path, %canonical, "redirecting to canonical url");
        return Ok(render::found(&canonical));
    }

    let urls = resolver.resolve(&target).await?;
    Ok(render::list_page(&urls).into_response())
}

fn split_zip(segment: String) -> (String, bool) {
    match segment.strip_suffix(ZIP_SUFFIX) {
        Some(stem) => (stem.to_string(), true),
        None => (segment, false),
    }
}

fn parse_id(what: &str, raw: &str) -> Result<u64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: '{}'", what, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_zip() {
        assert_eq!(split_zip("crystal.zip".into()), ("crystal".to_string(), true));
        assert_eq!(split_zip("crystal".into()), ("crystal".to_string(), false));
        assert_eq!(split_zip("7.zip".into()), ("7".to_string(), true));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("run id", "42").unwrap(), 42);
        assert!(matches!(parse_id("run id", "latest"), Err(AppError::BadRequest(_))));
        assert!(parse_id("artifact id", "-1").is_err());
    }
}
