//! Upstream API payloads.

use serde::{Deserialize, Serialize};

/// One workflow run, as listed by the runs-by-workflow endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub check_suite_id: Option<u64>,
    #[serde(default)]
    pub check_suite_url: Option<String>,
}

impl WorkflowRun {
    /// Check suite that produced this run.
    ///
    /// Prefers the explicit id and falls back to the last segment of
    /// `check_suite_url` (`.../check-suites/99`).
    pub fn suite_id(&self) -> Option<u64> {
        self.check_suite_id.or_else(|| {
            self.check_suite_url
                .as_deref()
                .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
                .and_then(|id| id.parse().ok())
        })
    }
}

/// Page of `GET repos/{org}/{repo}/actions/workflows/{workflow}/runs`.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsPage {
    pub workflow_runs: Vec<WorkflowRun>,
}

/// A build artifact attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
}

/// Page of `GET repos/{org}/{repo}/actions/runs/{run_id}/artifacts`.
#[derive(Debug, Deserialize)]
pub struct ArtifactsPage {
    pub artifacts: Vec<Artifact>,
}
