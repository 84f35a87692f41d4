//! HTTP-backed implementation of [`IndexClient`] (C3).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::version::{compare, parse_version, Comparison};
use crate::core::{IndexClient, IndexError, Result, Version};

use super::cache::Cache;

/// A single release file's metadata, as the index exposes it.
#[derive(Debug, Clone, Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    yanked: bool,
    #[serde(default)]
    requires_dist: Vec<String>,
}

/// The index's per-package JSON document: a map of raw version string to
/// its release files.
#[derive(Debug, Clone, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Clone)]
struct ResolvedRelease {
    version: Version,
    requires_dist: Vec<String>,
}

/// Fetches and caches released versions and requirement strings for a
/// package name from a PyPI-shaped index.
///
/// Throttles outbound requests to a configurable minimum interval (§4.3) and
/// caches per-name results for the lifetime of the client — callers
/// typically construct one `HttpIndexClient` per invocation.
pub struct HttpIndexClient {
    http: reqwest::Client,
    index_url: String,
    rate_limit: Duration,
    last_request: Mutex<Option<Instant>>,
    cache: Cache<String, Arc<Vec<ResolvedRelease>>>,
}

impl HttpIndexClient {
    /// Builds a client pointed at `index_url` (no trailing slash expected),
    /// throttling to `rate_limit_ms` between requests and caching responses
    /// for `cache_ttl`.
    pub fn new(index_url: impl Into<String>, rate_limit_ms: u64, request_timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .map_err(|e| IndexError::Unreachable(e.to_string()))?;

        Ok(Self {
            http,
            index_url: index_url.into(),
            rate_limit: Duration::from_millis(rate_limit_ms),
            last_request: Mutex::new(None),
            cache: Cache::new(Duration::from_secs(300)),
        })
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch(&self, name: &str) -> Result<Arc<Vec<ResolvedRelease>>> {
        if let Some(cached) = self.cache.get(&name.to_string()).await {
            return Ok(cached);
        }

        self.throttle().await;

        let url = format!("{}/{}/json", self.index_url.trim_end_matches('/'), name);
        debug!("fetching index metadata for '{}' from {}", name, url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                IndexError::Unreachable(format!("timed out fetching '{}': {}", name, e))
            } else {
                IndexError::Unreachable(format!("failed to fetch '{}': {}", name, e))
            }
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound(name.to_string()).into());
        }
        if !response.status().is_success() {
            return Err(IndexError::Unreachable(format!(
                "index returned HTTP {} for '{}'",
                response.status(),
                name
            ))
            .into());
        }

        let doc: IndexDocument = response
            .json()
            .await
            .map_err(|e| IndexError::MalformedResponse(format!("'{}': {}", name, e)))?;

        let releases = resolve_releases(doc);
        let releases = Arc::new(releases);
        self.cache.put(name.to_string(), releases.clone()).await;
        Ok(releases)
    }
}

/// Parses, filters yanked/empty entries, and falls back to pre-releases
/// when nothing else is available (§4.3).
fn resolve_releases(doc: IndexDocument) -> Vec<ResolvedRelease> {
    let mut parsed: Vec<ResolvedRelease> = Vec::new();

    for (raw_version, files) in doc.releases {
        if files.is_empty() || files.iter().all(|f| f.yanked) {
            continue;
        }
        let version = parse_version(&raw_version);
        if version.is_unknown() {
            warn!("skipping unparseable release version '{}'", raw_version);
            continue;
        }
        let requires_dist = files
            .iter()
            .find(|f| !f.yanked)
            .map(|f| f.requires_dist.clone())
            .unwrap_or_default();
        parsed.push(ResolvedRelease { version, requires_dist });
    }

    let is_prerelease = |r: &ResolvedRelease| match &r.version {
        Version::Parsed(p) => p.is_prerelease(),
        Version::Unknown(_) => false,
    };

    let stable: Vec<ResolvedRelease> = parsed.iter().filter(|r| !is_prerelease(r)).cloned().collect();
    let mut kept = if stable.is_empty() { parsed } else { stable };

    kept.sort_by(|a, b| match compare(&b.version, &a.version) {
        Comparison::Lt => std::cmp::Ordering::Less,
        Comparison::Eq => std::cmp::Ordering::Equal,
        Comparison::Gt => std::cmp::Ordering::Greater,
    });
    kept
}

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn versions(&self, name: &str) -> Result<Vec<Version>> {
        let releases = self.fetch(name).await?;
        Ok(releases.iter().map(|r| r.version.clone()).collect())
    }

    async fn requires(&self, name: &str, version: &Version) -> Result<Vec<String>> {
        let releases = self.fetch(name).await?;
        Ok(releases
            .iter()
            .find(|r| r.version.as_str() == version.as_str())
            .map(|r| r.requires_dist.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_releases_drops_yanked_and_empty() {
        let mut releases = HashMap::new();
        releases.insert(
            "1.0.0".to_string(),
            vec![ReleaseFile { yanked: true, requires_dist: vec![] }],
        );
        releases.insert(
            "2.0.0".to_string(),
            vec![ReleaseFile { yanked: false, requires_dist: vec!["click>=8.0".to_string()] }],
        );
        releases.insert("3.0.0".to_string(), vec![]);

        let resolved = resolve_releases(IndexDocument { releases });
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].version.as_str(), "2.0.0");
    }

    #[test]
    fn resolve_releases_sorts_descending() {
        let mut releases = HashMap::new();
        for v in ["1.0.0", "1.9.0", "1.10.0"] {
            releases.insert(
                v.to_string(),
                vec![ReleaseFile { yanked: false, requires_dist: vec![] }],
            );
        }

        let resolved = resolve_releases(IndexDocument { releases });
        let versions: Vec<&str> = resolved.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["1.10.0", "1.9.0", "1.0.0"]);
    }

    #[test]
    fn resolve_releases_falls_back_to_prereleases_when_nothing_stable() {
        let mut releases = HashMap::new();
        releases.insert(
            "2.0.0rc1".to_string(),
            vec![ReleaseFile { yanked: false, requires_dist: vec![] }],
        );

        let resolved = resolve_releases(IndexDocument { releases });
        assert_eq!(resolved.len(), 1);
    }
}
