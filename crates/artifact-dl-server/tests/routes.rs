//! Integration tests for the HTTP surface.
//!
//! These drive the full router against a counting fake of the upstream API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use artifact_dl_server::config::CacheSettings;
use artifact_dl_server::github::ActionsApi;
use artifact_dl_server::links::Links;
use artifact_dl_server::models::{Artifact, WorkflowRun};
use artifact_dl_server::{create_router, ResolveError, Resolver};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use url::Url;

const SIGNED: &str = "https://signed.example/blob";

/// Upstream double serving the crystal-lang/crystal scenario.
#[derive(Default)]
struct FakeActions {
    no_runs: bool,
    fail_listing: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl ActionsApi for FakeActions {
    async fn list_workflow_runs(
        &self,
        _org: &str,
        _repo: &str,
        _workflow: &str,
        _branch: &str,
    ) -> Result<Vec<WorkflowRun>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.no_runs {
            return Ok(Vec::new());
        }
        Ok(vec![WorkflowRun {
            id: 42,
            check_suite_id: None,
            check_suite_url: Some("https://api.github.com/repos/crystal-lang/crystal/check-suites/99".into()),
        }])
    }

    async fn list_artifacts(&self, _org: &str, _repo: &str, _run_id: u64) -> Result<Vec<Artifact>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(ResolveError::Upstream {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(vec![Artifact {
            id: 7,
            name: "crystal".into(),
        }])
    }

    async fn artifact_location(&self, _org: &str, _repo: &str, _artifact_id: u64) -> Result<String, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SIGNED.to_string())
    }
}

fn app_with(api: Arc<FakeActions>, prefix: &str) -> Router {
    let links = Links::new(prefix, Url::parse("https://github.com/").unwrap());
    let resolver = Arc::new(Resolver::new(api, links, CacheSettings::default()));
    create_router(resolver, prefix)
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("router is infallible")
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
}

async fn text_body(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_branch_zip_redirects_straight_to_signed_url() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/crystal-lang/crystal/win.yml/master/crystal.zip").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), SIGNED);
    let body = text_body(response).await;
    assert!(!body.contains("/crystal-lang/crystal/42/crystal"));
}

#[tokio::test]
async fn test_canonical_branch_request_lists_every_link() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/crystal-lang/crystal/win.yml/master/crystal").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = text_body(response).await;
    let expected = [
        "/crystal-lang/crystal/win.yml/master/crystal",
        "/crystal-lang/crystal/win.yml/master/crystal.zip",
        "/crystal-lang/crystal/42/crystal",
        "/crystal-lang/crystal/42/crystal.zip",
        "https://github.com/crystal-lang/crystal/suites/99/artifacts/7",
        "/crystal-lang/crystal/7",
        "/crystal-lang/crystal/7.zip",
        SIGNED,
    ];
    let positions: Vec<usize> = expected
        .iter()
        .map(|url| body.find(&format!("href=\"{}\"", url)).expect(url))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_non_canonical_request_redirects_without_upstream_calls() {
    let api = Arc::new(FakeActions::default());
    let app = app_with(api.clone(), "");

    let response = get(&app, "/crystal-lang/crystal/win.yml/master/%63rystal").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/crystal-lang/crystal/win.yml/master/crystal");
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_artifact_surfaces_at_canonical_url() {
    let api = Arc::new(FakeActions::default());
    let app = app_with(api.clone(), "");

    let response = get(&app, "/crystal-lang/crystal/42/%6Eightly").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/crystal-lang/crystal/42/nightly");
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);

    let response = get(&app, "/crystal-lang/crystal/42/nightly").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_run_and_artifact_endpoints() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/crystal-lang/crystal/42/crystal").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = text_body(response).await;
    assert!(body.contains("href=\"/crystal-lang/crystal/7.zip\""));
    assert!(!body.contains("/suites/"));

    let response = get(&app, "/crystal-lang/crystal/42/crystal.zip").await;
    assert_eq!(location(&response), SIGNED);

    let response = get(&app, "/crystal-lang/crystal/7").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/crystal-lang/crystal/7.zip").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), SIGNED);
}

#[tokio::test]
async fn test_repeat_requests_hit_the_caches() {
    let api = Arc::new(FakeActions::default());
    let app = app_with(api.clone(), "");

    get(&app, "/crystal-lang/crystal/win.yml/master/crystal.zip").await;
    get(&app, "/crystal-lang/crystal/win.yml/master/crystal.zip").await;
    get(&app, "/crystal-lang/crystal/win.yml/master/crystal").await;

    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_missing_run_is_404() {
    let app = app_with(
        Arc::new(FakeActions {
            no_runs: true,
            ..Default::default()
        }),
        "",
    );

    let response = get(&app, "/crystal-lang/crystal/win.yml/master/crystal.zip").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_artifact_name_is_404() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/crystal-lang/crystal/42/nightly.zip").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let app = app_with(
        Arc::new(FakeActions {
            fail_listing: true,
            ..Default::default()
        }),
        "",
    );

    let response = get(&app, "/crystal-lang/crystal/42/crystal.zip").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_non_numeric_run_id_is_400() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/crystal-lang/crystal/latest/crystal").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_root_without_query_shows_form() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = text_body(response).await;
    assert!(body.contains("<form>"));
    assert!(body.contains("placeholder=\"crystal-lang\""));
}

#[tokio::test]
async fn test_root_with_partial_query_shows_form() {
    let app = app_with(Arc::new(FakeActions::default()), "");

    let response = get(&app, "/?org=crystal-lang&repo=crystal&workflow=&branch=master").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text_body(response).await.contains("<form>"));
}

#[tokio::test]
async fn test_root_with_full_query_redirects_to_branch_page() {
    let api = Arc::new(FakeActions::default());
    let app = app_with(api.clone(), "");

    let response = get(
        &app,
        "/?user=crystal-lang&repo=crystal&workflow=win&branch=master&artifact=crystal",
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/crystal-lang/crystal/win/master/crystal");
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_links_carry_mount_prefix() {
    let app = app_with(Arc::new(FakeActions::default()), "/github_artifact");

    let response = get(&app, "/github_artifact/crystal-lang/crystal/7").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = text_body(response).await;
    assert!(body.contains("href=\"/github_artifact/crystal-lang/crystal/7.zip\""));

    let response = get(&app, "/crystal-lang/crystal/7").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
