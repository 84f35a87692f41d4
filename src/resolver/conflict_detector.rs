//! Conflict detection (C4): walks a normalized [`DependencyMap`] and reports
//! every dependency edge whose requirement the installed environment does
//! not satisfy.

use tracing::debug;

use crate::core::version::satisfies;
use crate::core::{Conflict, ConflictKind, DependencyMap, Version};

/// Detects conflicts across every parent/dependency edge in `map`.
///
/// Iteration order follows the map's sorted keys (parent name, then
/// dependency name) so that output is deterministic regardless of the
/// enumerator's original element order.
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_conflicts(&self, map: &DependencyMap) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for (parent_name, parent) in map.iter() {
            for (dep_name, required) in &parent.dependencies {
                if required.is_empty() {
                    continue;
                }

                let kind = match map.get(dep_name) {
                    None => Some((ConflictKind::NotInstalled, None)),
                    Some(dep_node) => match &dep_node.installed_version {
                        Version::Unknown(_) => {
                            Some((ConflictKind::UnparseableVersion, Some(dep_node.installed_version.clone())))
                        }
                        installed if !satisfies(installed, required) => {
                            Some((ConflictKind::VersionMismatch, Some(installed.clone())))
                        }
                        _ => None,
                    },
                };

                if let Some((kind, installed_version)) = kind {
                    debug!(
                        "conflict: {} requires {} {} ({:?})",
                        parent_name, dep_name, required, kind
                    );
                    conflicts.push(Conflict {
                        parent_name: parent_name.clone(),
                        parent_version: parent.installed_version.clone(),
                        dep_name: dep_name.clone(),
                        installed_version,
                        required: required.clone(),
                        kind,
                    });
                }
            }
        }

        conflicts
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}
