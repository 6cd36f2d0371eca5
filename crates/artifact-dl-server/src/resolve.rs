//! The resolution pipeline: branch -> run -> artifact -> signed download URL.
//!
//! Each stage appends the URLs it knows about to an ordered list, least
//! direct first, then hands over to the next stage. Every URL in the list
//! leads to the same artifact archive; the last one is the upstream's
//! short-lived signed link.

use std::sync::Arc;

use crate::cache::StageCache;
use crate::config::CacheSettings;
use crate::error::{MissingInput, ResolveError};
use crate::github::ActionsApi;
use crate::links::{normalize_workflow, Links};
use crate::models::{Artifact, WorkflowRun};

/// Latest successful run of a workflow on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchTarget {
    pub org: String,
    pub repo: String,
    pub workflow: String,
    pub branch: String,
    pub artifact: String,
}

/// A named artifact of one specific run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunTarget {
    pub org: String,
    pub repo: String,
    pub run_id: u64,
    pub artifact: String,
}

/// One artifact by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactTarget {
    pub org: String,
    pub repo: String,
    pub artifact_id: u64,
}

/// Any entry point into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Branch(BranchTarget),
    Run(RunTarget),
    Artifact(ArtifactTarget),
}

impl Target {
    /// First URL [`Resolver::resolve`] yields for this target. Needs no
    /// upstream call.
    pub fn canonical_url(&self, links: &Links) -> String {
        match self {
            Target::Branch(t) => links.by_branch(&t.org, &t.repo, &t.workflow, &t.branch, &t.artifact),
            Target::Run(t) => links.by_run(&t.org, &t.repo, t.run_id, &t.artifact),
            Target::Artifact(t) => links.by_artifact(&t.org, &t.repo, t.artifact_id),
        }
    }
}

impl From<BranchTarget> for Target {
    fn from(target: BranchTarget) -> Self {
        Target::Branch(target)
    }
}

impl From<RunTarget> for Target {
    fn from(target: RunTarget) -> Self {
        Target::Run(target)
    }
}

impl From<ArtifactTarget> for Target {
    fn from(target: ArtifactTarget) -> Self {
        Target::Artifact(target)
    }
}

/// Loosely-typed branch target, as submitted by the root form.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct BranchQuery {
    #[serde(alias = "user")]
    pub org: Option<String>,
    pub repo: Option<String>,
    pub workflow: Option<String>,
    pub branch: Option<String>,
    pub artifact: Option<String>,
}

impl TryFrom<BranchQuery> for BranchTarget {
    type Error = MissingInput;

    fn try_from(query: BranchQuery) -> Result<Self, Self::Error> {
        fn required(value: Option<String>, field: &'static str) -> Result<String, MissingInput> {
            value.filter(|v| !v.is_empty()).ok_or(MissingInput(field))
        }

        Ok(BranchTarget {
            org: required(query.org, "org")?,
            repo: required(query.repo, "repo")?,
            workflow: required(query.workflow, "workflow")?,
            branch: required(query.branch, "branch")?,
            artifact: required(query.artifact, "artifact")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunKey {
    org: String,
    repo: String,
    workflow: String,
    branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ListingKey {
    org: String,
    repo: String,
    run_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LocationKey {
    org: String,
    repo: String,
    artifact_id: u64,
}

/// Chains the upstream lookups, each behind its own stage cache.
pub struct Resolver {
    api: Arc<dyn ActionsApi>,
    links: Links,
    runs: StageCache<RunKey, WorkflowRun>,
    listings: StageCache<ListingKey, Vec<Artifact>>,
    locations: StageCache<LocationKey, String>,
}

impl Resolver {
    pub fn new(api: Arc<dyn ActionsApi>, links: Links, caches: CacheSettings) -> Self {
        Self {
            api,
            links,
            runs: StageCache::new("run-lookup", caches.runs),
            listings: StageCache::new("artifact-listing", caches.listings),
            locations: StageCache::new("artifact-location", caches.locations),
        }
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    /// All URLs leading to `target`'s archive, least direct first.
    pub async fn resolve(&self, target: &Target) -> Result<Vec<String>, ResolveError> {
        let mut urls = Vec::new();
        match target {
            Target::Branch(t) => self.by_branch(t, &mut urls).await?,
            Target::Run(t) => self.by_run(t, None, &mut urls).await?,
            Target::Artifact(t) => self.by_artifact(t, None, &mut urls).await?,
        }
        Ok(urls)
    }

    async fn by_branch(&self, t: &BranchTarget, urls: &mut Vec<String>) -> Result<(), ResolveError> {
        urls.push(self.links.by_branch(&t.org, &t.repo, &t.workflow, &t.branch, &t.artifact));
        urls.push(self.links.by_branch_zip(&t.org, &t.repo, &t.workflow, &t.branch, &t.artifact));

        let key = RunKey {
            org: t.org.clone(),
            repo: t.repo.clone(),
            workflow: normalize_workflow(&t.workflow),
            branch: t.branch.clone(),
        };
        let run = self
            .runs
            .get_or_try_insert_with(&key, || async {
                let runs = self
                    .api
                    .list_workflow_runs(&key.org, &key.repo, &key.workflow, &key.branch)
                    .await?;
                runs.into_iter().next().ok_or_else(|| {
                    ResolveError::NotFound(format!(
                        "No successful push run of {} on branch '{}' in {}/{}",
                        key.workflow, key.branch, key.org, key.repo
                    ))
                })
            })
            .await?;

        let next = RunTarget {
            org: t.org.clone(),
            repo: t.repo.clone(),
            run_id: run.id,
            artifact: t.artifact.clone(),
        };
        self.by_run(&next, run.suite_id(), urls).await
    }

    async fn by_run(
        &self,
        t: &RunTarget,
        suite_id: Option<u64>,
        urls: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        urls.push(self.links.by_run(&t.org, &t.repo, t.run_id, &t.artifact));
        urls.push(self.links.by_run_zip(&t.org, &t.repo, t.run_id, &t.artifact));

        let key = ListingKey {
            org: t.org.clone(),
            repo: t.repo.clone(),
            run_id: t.run_id,
        };
        let artifacts = self
            .listings
            .get_or_try_insert_with(&key, || self.api.list_artifacts(&key.org, &key.repo, key.run_id))
            .await?;

        let artifact = artifacts
            .iter()
            .find(|a| a.name == t.artifact)
            .ok_or_else(|| {
                ResolveError::NotFound(format!("Run {} has no artifact named '{}'", t.run_id, t.artifact))
            })?;

        let next = ArtifactTarget {
            org: t.org.clone(),
            repo: t.repo.clone(),
            artifact_id: artifact.id,
        };
        self.by_artifact(&next, suite_id, urls).await
    }

    async fn by_artifact(
        &self,
        t: &ArtifactTarget,
        suite_id: Option<u64>,
        urls: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        if let Some(suite_id) = suite_id {
            urls.push(self.links.suite_artifact(&t.org, &t.repo, suite_id, t.artifact_id));
        }
        urls.push(self.links.by_artifact(&t.org, &t.repo, t.artifact_id));
        urls.push(self.links.by_artifact_zip(&t.org, &t.repo, t.artifact_id));

        let key = LocationKey {
            org: t.org.clone(),
            repo: t.repo.clone(),
            artifact_id: t.artifact_id,
        };
        let location = self
            .locations
            .get_or_try_insert_with(&key, || {
                self.api.artifact_location(&key.org, &key.repo, key.artifact_id)
            })
            .await?;

        urls.push(location);
        Ok(())
    }
}
