//! Service configuration.

use std::time::Duration;

use url::Url;

/// Default upstream REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com/";

/// Default upstream web UI root, used for suite deep links.
pub const DEFAULT_WEB_BASE: &str = "https://github.com/";

/// Size and freshness window of one stage cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLimits {
    pub capacity: usize,
    pub ttl: Duration,
}

impl StageLimits {
    pub const fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }
}

/// Limits for the three stage caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// (org, repo, workflow, branch) -> latest successful run.
    pub runs: StageLimits,
    /// (org, repo, run id) -> artifact listing.
    pub listings: StageLimits,
    /// (org, repo, artifact id) -> signed download URL. Upstream signs these
    /// for about a minute, so the window must stay below that.
    pub locations: StageLimits,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            runs: StageLimits::new(100, Duration::from_secs(5 * 60)),
            listings: StageLimits::new(1000, Duration::from_secs(5 * 60)),
            locations: StageLimits::new(1000, Duration::from_secs(50)),
        }
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_base: Url,
    pub web_base: Url,
    pub token: String,
    /// Public mount path, e.g. `/github_artifact`. Empty mounts at the root.
    pub prefix: String,
    pub caches: CacheSettings,
}

impl ServerConfig {
    /// Config against the public upstream with default cache limits.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: with_trailing_slash(parse_static(DEFAULT_API_BASE)),
            web_base: with_trailing_slash(parse_static(DEFAULT_WEB_BASE)),
            token: token.into(),
            prefix: String::new(),
            caches: CacheSettings::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = with_trailing_slash(api_base);
        self
    }

    pub fn with_web_base(mut self, web_base: Url) -> Self {
        self.web_base = with_trailing_slash(web_base);
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    pub fn with_caches(mut self, caches: CacheSettings) -> Self {
        self.caches = caches;
        self
    }
}

fn parse_static(url: &'static str) -> Url {
    Url::parse(url).expect("built-in base url is valid")
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// `"github_artifact/"` -> `"/github_artifact"`, `"/"` -> `""`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
