//! Canonical URL construction for every stage of the pipeline.

use url::Url;

use crate::config::with_trailing_slash;

/// Percent-encode `segments` and join them into an absolute path under `prefix`.
pub fn encode_path<S: AsRef<str>>(prefix: &str, segments: &[S]) -> String {
    // Only the path of this throwaway URL is used.
    let mut url = Url::parse("http://localhost/").expect("static url parses");
    url.set_path(prefix);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.path().to_string()
}

/// Builds the service's own URLs, plus deep links into the upstream web UI.
#[derive(Debug, Clone)]
pub struct Links {
    prefix: String,
    web_base: Url,
}

impl Links {
    pub fn new(prefix: impl Into<String>, web_base: Url) -> Self {
        Self {
            prefix: prefix.into(),
            web_base: with_trailing_slash(web_base),
        }
    }

    pub fn by_branch(&self, org: &str, repo: &str, workflow: &str, branch: &str, artifact: &str) -> String {
        encode_path(&self.prefix, &[org, repo, workflow, branch, artifact])
    }

    pub fn by_branch_zip(&self, org: &str, repo: &str, workflow: &str, branch: &str, artifact: &str) -> String {
        encode_path(&self.prefix, &[org, repo, workflow, branch, zip_name(artifact).as_str()])
    }

    pub fn by_run(&self, org: &str, repo: &str, run_id: u64, artifact: &str) -> String {
        encode_path(&self.prefix, &[org, repo, run_id.to_string().as_str(), artifact])
    }

    pub fn by_run_zip(&self, org: &str, repo: &str, run_id: u64, artifact: &str) -> String {
        encode_path(&self.prefix, &[org, repo, run_id.to_string().as_str(), zip_name(artifact).as_str()])
    }

    pub fn by_artifact(&self, org: &str, repo: &str, artifact_id: u64) -> String {
        encode_path(&self.prefix, &[org, repo, artifact_id.to_string().as_str()])
    }

    pub fn by_artifact_zip(&self, org: &str, repo: &str, artifact_id: u64) -> String {
        encode_path(&self.prefix, &[org, repo, zip_name(&artifact_id.to_string()).as_str()])
    }

    /// Artifact page of a check suite in the upstream web UI.
    pub fn suite_artifact(&self, org: &str, repo: &str, suite_id: u64, artifact_id: u64) -> String {
        let mut url = self.web_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend([
                org,
                repo,
                "suites",
                suite_id.to_string().as_str(),
                "artifacts",
                artifact_id.to_string().as_str(),
            ]);
        }
        url.into()
    }
}

fn zip_name(name: &str) -> String {
    format!("{}.zip", name)
}

/// Bare workflow names get a `.yml` suffix; numeric ids and file names pass through.
pub fn normalize_workflow(workflow: &str) -> String {
    let numeric = !workflow.is_empty() && workflow.bytes().all(|b| b.is_ascii_digit());
    if numeric || workflow.ends_with(".yml") {
        workflow.to_string()
    } else {
        format!("{}.yml", workflow)
    }
}
