//! Client for the upstream build-automation REST API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::with_trailing_slash;
use crate::error::{ClientError, ResolveError};
use crate::links::encode_path;
use crate::models::{Artifact, ArtifactsPage, WorkflowRun, WorkflowRunsPage};

const USER_AGENT: &str = concat!("artifact-dl/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// The three upstream lookups the resolution pipeline depends on.
#[async_trait]
pub trait ActionsApi: Send + Sync {
    /// First page (one entry) of successful push-triggered runs of `workflow` on `branch`.
    async fn list_workflow_runs(
        &self,
        org: &str,
        repo: &str,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>, ResolveError>;

    /// Artifacts uploaded by `run_id`.
    async fn list_artifacts(&self, org: &str, repo: &str, run_id: u64) -> Result<Vec<Artifact>, ResolveError>;

    /// Short-lived signed download URL of an artifact's archive.
    async fn artifact_location(&self, org: &str, repo: &str, artifact_id: u64) -> Result<String, ResolveError>;
}

/// Authenticated HTTP client for the upstream API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    base: Url,
    following: reqwest::Client,
    direct: reqwest::Client,
}

impl GitHubClient {
    /// Build a client that sends `token` as a bearer credential on every call.
    pub fn new(base: Url, token: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let following = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers.clone())
            .build()?;
        let direct = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base: with_trailing_slash(base),
            following,
            direct,
        })
    }

    /// Send one request to `path`, relative to the API base.
    ///
    /// Any status outside 2xx becomes [`ResolveError::Upstream`], except that
    /// with `follow_redirects == false` a 3xx response is handed back as is
    /// so the caller can read its `Location`.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
        follow_redirects: bool,
    ) -> Result<Response, ResolveError> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ResolveError::InvalidResponse(format!("Bad endpoint path '{}': {}", path, e)))?;

        let client = if follow_redirects { &self.following } else { &self.direct };
        let mut request = client.request(method.clone(), url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, path, "upstream request");
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() || (!follow_redirects && status.is_redirection()) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%method, path, status = status.as_u16(), "upstream request failed");
        Err(ResolveError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ResolveError> {
        let response = self.call(Method::GET, path, query, None, true).await?;
        Ok(response.json().await?)
    }

    /// `Location` of the redirect `path` answers with.
    async fn get_location(&self, path: &str) -> Result<String, ResolveError> {
        let response = self.call(Method::GET, path, &[], None, false).await?;
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ResolveError::InvalidResponse(format!(
                    "{} answered {} without a Location header",
                    path,
                    response.status()
                ))
            })
    }
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn list_workflow_runs(
        &self,
        org: &str,
        repo: &str,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>, ResolveError> {
        let path = encode_path("", &["repos", org, repo, "actions", "workflows", workflow, "runs"]);
        let query = [
            ("branch", branch),
            ("event", "push"),
            ("status", "success"),
            ("per_page", "1"),
        ];
        let page: WorkflowRunsPage = self.get_json(&path, &query).await?;
        Ok(page.workflow_runs)
    }

    async fn list_artifacts(&self, org: &str, repo: &str, run_id: u64) -> Result<Vec<Artifact>, ResolveError> {
        let run_id = run_id.to_string();
        let path = encode_path("", &["repos", org, repo, "actions", "runs", run_id.as_str(), "artifacts"]);
        let page: ArtifactsPage = self.get_json(&path, &[]).await?;
        Ok(page.artifacts)
    }

    async fn artifact_location(&self, org: &str, repo: &str, artifact_id: u64) -> Result<String, ResolveError> {
        let artifact_id = artifact_id.to_string();
        let path = encode_path("", &["repos", org, repo, "actions", "artifacts", artifact_id.as_str(), "zip"]);
        self.get_location(&path).await
    }
}
