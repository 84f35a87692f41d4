//! Core data model for the dependency conflict engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::version::{SpecifierSet, Version};

/// Normalizes a package name the way the index and every installed
/// distribution eventually agree on: lowercased, with runs of `_`, `-`, `.`
/// collapsed to a single `-`.
///
/// ```
/// use depdoctor::core::normalize_name;
/// assert_eq!(normalize_name("PyYAML"), "pyyaml");
/// assert_eq!(normalize_name("zope.interface"), "zope-interface");
/// assert_eq!(normalize_name("foo__bar--baz"), "foo-bar-baz");
/// ```
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_ascii_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_separator = false;
    for ch in lowered.chars() {
        if ch == '_' || ch == '-' || ch == '.' {
            if !last_was_separator {
                out.push('-');
                last_was_separator = true;
            }
        } else {
            out.push(ch);
            last_was_separator = false;
        }
    }
    out.trim_matches('-').to_string()
}

/// A single installed package and its declared dependencies.
///
/// A node is created once per distinct normalized name. Duplicate sightings
/// from the enumerator retain the first `installed_version` seen and union
/// their dependency maps (see [`PackageNode::merge_from`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Normalized package name.
    pub name: String,
    /// The version currently installed in the environment.
    pub installed_version: Version,
    /// Outbound dependency edges: normalized dep name -> combined specifier set.
    pub dependencies: BTreeMap<String, SpecifierSet>,
}

impl PackageNode {
    /// Creates a new node with no declared dependencies.
    pub fn new(name: impl Into<String>, installed_version: Version) -> Self {
        Self {
            name: name.into(),
            installed_version,
            dependencies: BTreeMap::new(),
        }
    }

    /// Merges a second sighting of the same package into this node: the
    /// already-recorded `installed_version` wins, and dependency entries are
    /// unioned (duplicate dep names have their specifier sets intersected).
    pub fn merge_from(&mut self, other: PackageNode) {
        for (dep_name, spec) in other.dependencies {
            self.dependencies
                .entry(dep_name)
                .and_modify(|existing| *existing = existing.intersect(&spec))
                .or_insert(spec);
        }
    }
}

/// A canonical, name-keyed graph of installed packages and their
/// dependency edges. The map is the single owner of [`PackageNode`]s; edges
/// are name-keyed lookups rather than direct references, which keeps the
/// structure trivially cloneable and serializable and avoids any
/// cycle-ownership concerns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyMap {
    nodes: BTreeMap<String, PackageNode>,
}

impl DependencyMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or merges a node, keyed by its already-normalized name.
    pub fn upsert(&mut self, node: PackageNode) {
        self.nodes
            .entry(node.name.clone())
            .and_modify(|existing| {
                let incoming = node.clone();
                existing.merge_from(incoming);
            })
            .or_insert(node);
    }

    /// Looks up a node by normalized name.
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Iterates nodes in deterministic (sorted by name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PackageNode)> {
        self.nodes.iter()
    }

    /// Number of distinct packages in the map.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the map has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a copy of this map with `name`'s installed version replaced,
    /// used by the resolver's validation sweep (§4.5 step 6) to test a
    /// candidate plan without mutating the real graph.
    pub fn with_installed_version(&self, name: &str, version: Version) -> DependencyMap {
        let mut clone = self.clone();
        if let Some(node) = clone.nodes.get_mut(name) {
            node.installed_version = version;
        }
        clone
    }
}

/// The kind of dependency conflict detected for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The installed version does not satisfy the parent's specifier set.
    VersionMismatch,
    /// The dependency is not present in the dependency map at all.
    NotInstalled,
    /// The installed version string could not be parsed as a version.
    UnparseableVersion,
}

/// A single detected conflict on a (parent, dependency) edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Normalized name of the package declaring the requirement.
    pub parent_name: String,
    /// Installed version of the parent.
    pub parent_version: Version,
    /// Normalized name of the dependency.
    pub dep_name: String,
    /// Installed version of the dependency, if one is installed at all.
    pub installed_version: Option<Version>,
    /// The specifier set the parent requires of the dependency.
    pub required: SpecifierSet,
    /// What kind of conflict this is.
    pub kind: ConflictKind,
}

/// A single proposed version change in a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionItem {
    /// Normalized package name.
    pub package_name: String,
    /// Version currently installed, if the package was installed at all.
    pub current_version: Option<Version>,
    /// The version the resolver selected.
    pub target_version: Version,
    /// The conflicts this change is meant to resolve.
    pub satisfies: Vec<Conflict>,
}

/// A bucket of conflicts the resolver could not reconcile with any
/// available candidate version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsolvableBucket {
    /// Normalized package name.
    pub package_name: String,
    /// The combined specifier set no candidate satisfied.
    pub combined: SpecifierSet,
    /// The conflicts that fed into this bucket.
    pub conflicts: Vec<Conflict>,
}

/// An ordered sequence of version changes, plus whatever the resolver could
/// not reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Resolved items, topologically ordered (dependency-free packages first).
    pub items: Vec<ResolutionItem>,
    /// Buckets the resolver gave up on.
    pub unsolvable: Vec<UnsolvableBucket>,
}

impl Plan {
    /// An empty plan: no changes, nothing unsolvable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether applying this plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single entry in a [`LockFile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Normalized package name.
    pub name: String,
    /// Exact installed version at lock time.
    pub version: String,
    /// Outbound dependency specifiers, keyed by normalized name, sorted.
    pub dependencies: BTreeMap<String, String>,
}

/// Canonical snapshot of an environment sufficient to reconstruct it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// Format version; bumped whenever the entry shape changes incompatibly.
    pub schema_version: u32,
    /// ISO-8601 UTC timestamp of when this snapshot was taken.
    pub generated_at: String,
    /// Entries, ascending by `name`.
    pub entries: Vec<LockEntry>,
}

/// Current lock file schema version produced by this engine.
pub const LOCK_SCHEMA_VERSION: u32 = 1;

/// Runtime configuration every component borrows instead of reading process
/// environment or a global. Constructed once per invocation by the caller
/// (the out-of-scope CLI front-end, or an embedding application).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the package index metadata service.
    pub index_url: String,
    /// Minimum spacing between outbound index requests, in milliseconds.
    pub rate_limit_ms: u64,
    /// Per-request timeout for index calls, in milliseconds.
    pub request_timeout_ms: u64,
    /// Optional on-disk cache directory for index responses.
    pub cache_dir: Option<PathBuf>,
    /// When true, the executor reports intended invocations without side effects.
    pub dry_run: bool,
    /// Whether `restore()` may uninstall packages absent from the lock file.
    pub allow_uninstall_on_restore: bool,
}

impl EngineConfig {
    /// Configuration pointed at the real Python Package Index.
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            rate_limit_ms: 200,
            request_timeout_ms: 10_000,
            cache_dir: dirs::cache_dir().map(|d| d.join("depdoctor")),
            dry_run: false,
            allow_uninstall_on_restore: false,
        }
    }

    /// Validates the configuration, rejecting values that would make every
    /// downstream component misbehave silently.
    pub fn validate(&self) -> Result<(), String> {
        if self.index_url.trim().is_empty() {
            return Err("index_url must not be empty".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("https://pypi.org/pypi")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::parse_version;

    #[test]
    fn normalize_name_collapses_separators() {
        assert_eq!(normalize_name("PIL"), "pil");
        assert_eq!(normalize_name("Pillow"), "pillow");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("foo__bar"), "foo-bar");
        assert_eq!(normalize_name("foo_-.bar"), "foo-bar");
    }

    #[test]
    fn upsert_collapses_duplicate_sightings() {
        let mut map = DependencyMap::new();
        map.upsert(PackageNode::new("pillow", parse_version("9.0.0")));
        map.upsert(PackageNode::new("pillow", parse_version("9.5.0")));

        let node = map.get("pillow").unwrap();
        // First-seen installed_version wins.
        assert_eq!(node.installed_version, parse_version("9.0.0"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn upsert_unions_dependency_edges() {
        let mut a = PackageNode::new("app", parse_version("1.0.0"));
        a.dependencies.insert(
            "requests".to_string(),
            crate::core::version::parse_specifier_set(">=2.0"),
        );
        let mut b = PackageNode::new("app", parse_version("1.0.0"));
        b.dependencies.insert(
            "click".to_string(),
            crate::core::version::parse_specifier_set(">=8.0"),
        );

        let mut map = DependencyMap::new();
        map.upsert(a);
        map.upsert(b);

        let node = map.get("app").unwrap();
        assert_eq!(node.dependencies.len(), 2);
    }

    #[test]
    fn engine_config_validate_rejects_empty_index_url() {
        let mut config = EngineConfig::default();
        config.index_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn with_installed_version_does_not_mutate_original() {
        let mut map = DependencyMap::new();
        map.upsert(PackageNode::new("pillow", parse_version("9.0.0")));

        let virtual_map = map.with_installed_version("pillow", parse_version("10.0.0"));
        assert_eq!(
            map.get("pillow").unwrap().installed_version,
            parse_version("9.0.0")
        );
        assert_eq!(
            virtual_map.get("pillow").unwrap().installed_version,
            parse_version("10.0.0")
        );
    }
}
