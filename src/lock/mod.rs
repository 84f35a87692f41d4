//! Lock / restore (C7): snapshotting a [`DependencyMap`] to a portable
//! [`LockFile`] and computing the plan to bring an environment back to it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::version::parse_version;
use crate::core::{DependencyMap, LockEntry, LockError, LockFile, Plan, ResolutionItem, Result, LOCK_SCHEMA_VERSION};

/// Snapshots `map` into a [`LockFile`]. Entries are already sorted by
/// normalized name because [`DependencyMap`] iterates its `BTreeMap`.
pub fn lock(map: &DependencyMap, generated_at: impl Into<String>) -> LockFile {
    let entries = map
        .iter()
        .map(|(name, node)| LockEntry {
            name: name.clone(),
            version: node.installed_version.as_str().to_string(),
            dependencies: node
                .dependencies
                .iter()
                .map(|(dep, spec)| (dep.clone(), spec.to_raw_string()))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect();

    LockFile {
        schema_version: LOCK_SCHEMA_VERSION,
        generated_at: generated_at.into(),
        entries,
    }
}

/// Serializes `lockfile` as canonical JSON: sorted keys (via `BTreeMap`
/// fields), UTF-8, a single trailing newline.
pub fn to_canonical_json(lockfile: &LockFile) -> Result<String> {
    let mut s = serde_json::to_string_pretty(lockfile).map_err(|e| crate::core::Error::Other(e.to_string()))?;
    s.push('\n');
    Ok(s)
}

/// Parses a canonical JSON lock file, rejecting schema versions this engine
/// doesn't understand.
pub fn from_json(raw: &str) -> Result<LockFile> {
    let lockfile: LockFile = serde_json::from_str(raw).map_err(|e| LockError::Malformed(e.to_string()))?;
    if lockfile.schema_version != LOCK_SCHEMA_VERSION {
        return Err(LockError::UnsupportedSchema(lockfile.schema_version).into());
    }
    Ok(lockfile)
}

/// The work needed to bring `current` back to `lockfile`.
#[derive(Debug, Clone, Default)]
pub struct RestorePlan {
    /// Installs and version changes, ready for the executor.
    pub apply: Plan,
    /// Packages installed now but absent from the lock file. Only
    /// meaningful to act on when the caller's `allow_uninstall_on_restore`
    /// is set; otherwise this is purely informational.
    pub extraneous: Vec<String>,
}

impl RestorePlan {
    pub fn is_empty(&self) -> bool {
        self.apply.is_empty() && self.extraneous.is_empty()
    }
}

/// Computes the delta between `current` and `lockfile`. Idempotent: an
/// already-matching environment produces an empty plan.
pub fn restore(lockfile: &LockFile, current: &DependencyMap) -> RestorePlan {
    let mut items = Vec::new();

    for entry in &lockfile.entries {
        let target = parse_version(&entry.version);
        match current.get(&entry.name) {
            None => {
                debug!("'{}' missing from environment, will install {}", entry.name, entry.version);
                items.push(ResolutionItem {
                    package_name: entry.name.clone(),
                    current_version: None,
                    target_version: target,
                    satisfies: vec![],
                });
            }
            Some(node) if node.installed_version.as_str() != entry.version => {
                debug!(
                    "'{}' is {} in the environment but locked at {}",
                    entry.name,
                    node.installed_version,
                    entry.version
                );
                items.push(ResolutionItem {
                    package_name: entry.name.clone(),
                    current_version: Some(node.installed_version.clone()),
                    target_version: target,
                    satisfies: vec![],
                });
            }
            Some(_) => {}
        }
    }

    let locked_names: std::collections::BTreeSet<&str> = lockfile.entries.iter().map(|e| e.name.as_str()).collect();
    let extraneous: Vec<String> = current
        .iter()
        .filter(|(name, _)| !locked_names.contains(name.as_str()))
        .map(|(name, _)| name.clone())
        .collect();

    RestorePlan { apply: Plan { items, unsolvable: vec![] }, extraneous }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PackageNode;
    use crate::core::version::parse_specifier_set;

    fn node(name: &str, version: &str) -> PackageNode {
        PackageNode::new(name.to_string(), parse_version(version))
    }

    #[test]
    fn lock_snapshot_sorts_entries_and_dependencies() {
        let mut map = DependencyMap::new();
        let mut app = node("app", "1.0.0");
        app.dependencies.insert("click".to_string(), parse_specifier_set(">=8.0"));
        map.upsert(app);
        map.upsert(node("click", "8.1.0"));

        let lockfile = lock(&map, "2026-01-01T00:00:00Z");
        assert_eq!(lockfile.entries.len(), 2);
        assert_eq!(lockfile.entries[0].name, "app");
        assert_eq!(lockfile.entries[0].dependencies.get("click").unwrap(), ">=8.0");
    }

    #[test]
    fn restore_is_empty_for_matching_environment() {
        let mut map = DependencyMap::new();
        map.upsert(node("click", "8.1.0"));
        let lockfile = lock(&map, "2026-01-01T00:00:00Z");

        let plan = restore(&lockfile, &map);
        assert!(plan.is_empty());
    }

    #[test]
    fn restore_plans_a_version_change() {
        let mut map = DependencyMap::new();
        map.upsert(node("click", "8.1.0"));
        let lockfile = lock(&map, "2026-01-01T00:00:00Z");

        let mut drifted = DependencyMap::new();
        drifted.upsert(node("click", "7.0.0"));

        let plan = restore(&lockfile, &drifted);
        assert_eq!(plan.apply.items.len(), 1);
        assert_eq!(plan.apply.items[0].target_version.as_str(), "8.1.0");
    }

    #[test]
    fn restore_plans_a_missing_install() {
        let mut map = DependencyMap::new();
        map.upsert(node("click", "8.1.0"));
        let lockfile = lock(&map, "2026-01-01T00:00:00Z");

        let empty = DependencyMap::new();
        let plan = restore(&lockfile, &empty);
        assert_eq!(plan.apply.items.len(), 1);
        assert_eq!(plan.apply.items[0].current_version, None);
    }

    #[test]
    fn restore_reports_extraneous_packages() {
        let map = DependencyMap::new();
        let lockfile = lock(&map, "2026-01-01T00:00:00Z");

        let mut current = DependencyMap::new();
        current.upsert(node("leftover", "1.0.0"));

        let plan = restore(&lockfile, &current);
        assert_eq!(plan.extraneous, vec!["leftover".to_string()]);
    }

    #[test]
    fn round_trip_through_canonical_json() {
        let mut map = DependencyMap::new();
        map.upsert(node("click", "8.1.0"));
        let lockfile = lock(&map, "2026-01-01T00:00:00Z");

        let json = to_canonical_json(&lockfile).unwrap();
        let parsed = from_json(&json).unwrap();
        assert_eq!(parsed.entries.len(), 1);
    }

    #[test]
    fn unsupported_schema_version_is_rejected() {
        let raw = r#"{"schema_version":999,"generated_at":"x","entries":[]}"#;
        assert!(from_json(raw).is_err());
    }
}
