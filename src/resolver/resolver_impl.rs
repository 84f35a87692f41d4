//! Resolution (C5): turns a flat conflict list into an ordered [`Plan`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::core::version::{compare, parse_version, satisfies, Comparison};
use crate::core::{
    normalize_name, parse_specifier_set, Conflict, DependencyMap, IndexClient, Plan,
    ResolutionItem, Result, SpecifierSet, UnsolvableBucket, Version,
};

use super::conflict_detector::ConflictDetector;

static REQUIREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\((?P<paren>[^)]*)\)|(?P<bare>.*))?$").unwrap());

/// Splits a `requires_dist`-style string (`"click (>=7.0)"` or `"click>=7.0"`)
/// into a normalized name and its specifier set.
fn parse_requirement_string(raw: &str) -> Option<(String, SpecifierSet)> {
    let caps = REQUIREMENT_RE.captures(raw.trim())?;
    let name = normalize_name(caps.get(1)?.as_str());
    let spec_raw = caps
        .name("paren")
        .or_else(|| caps.name("bare"))
        .map(|m| m.as_str())
        .unwrap_or("");
    Some((name, parse_specifier_set(spec_raw)))
}

/// Orders versions so the newest sorts first — the tie-break used once
/// candidates are grouped by compatibility score (§4.5 step 4).
fn compare_desc(a: &Version, b: &Version) -> Ordering {
    match compare(b, a) {
        Comparison::Lt => Ordering::Less,
        Comparison::Eq => Ordering::Equal,
        Comparison::Gt => Ordering::Greater,
    }
}

/// Computes the resolution plan for a set of detected conflicts.
pub struct DependencyResolverImpl<'a, I: IndexClient> {
    index: &'a I,
    detector: ConflictDetector,
}

impl<'a, I: IndexClient> DependencyResolverImpl<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self {
            index,
            detector: ConflictDetector::new(),
        }
    }

    /// Runs the full C5 pipeline: group, fetch, filter, rank, assemble,
    /// validate.
    pub async fn resolve(&self, conflicts: &[Conflict], map: &DependencyMap) -> Result<Plan> {
        let buckets = self.group_conflicts(conflicts, map);

        let mut items = Vec::new();
        let mut unsolvable = Vec::new();

        for (dep_name, (combined, bucket_conflicts)) in buckets {
            match self.resolve_bucket(&dep_name, &combined, map).await {
                Ok(Some(target)) => {
                    let current_version = map.get(&dep_name).map(|n| n.installed_version.clone());
                    items.push(ResolutionItem {
                        package_name: dep_name,
                        current_version,
                        target_version: target,
                        satisfies: bucket_conflicts,
                    });
                }
                Ok(None) => {
                    warn!("no candidate of '{}' satisfies the combined requirement", dep_name);
                    unsolvable.push(UnsolvableBucket {
                        package_name: dep_name,
                        combined,
                        conflicts: bucket_conflicts,
                    });
                }
                Err(e) => {
                    warn!("failed to resolve '{}': {}", dep_name, e);
                    unsolvable.push(UnsolvableBucket {
                        package_name: dep_name,
                        combined,
                        conflicts: bucket_conflicts,
                    });
                }
            }
        }

        let ordered = self.topological_order(items, map).await;
        let (validated, newly_unsolvable) = self.validate(ordered, map);
        unsolvable.extend(newly_unsolvable);

        info!(
            "resolution complete: {} items planned, {} unsolvable",
            validated.len(),
            unsolvable.len()
        );

        Ok(Plan { items: validated, unsolvable })
    }

    /// Step 1: bucket conflicts by `dep_name`, combining the conflicting
    /// parents' specifiers with every other node's specifier for the same
    /// dependency — even currently-satisfied ones.
    fn group_conflicts(
        &self,
        conflicts: &[Conflict],
        map: &DependencyMap,
    ) -> BTreeMap<String, (SpecifierSet, Vec<Conflict>)> {
        let mut buckets: BTreeMap<String, (SpecifierSet, Vec<Conflict>)> = BTreeMap::new();

        for conflict in conflicts {
            let entry = buckets
                .entry(conflict.dep_name.clone())
                .or_insert_with(|| (SpecifierSet::empty(), Vec::new()));
            entry.0 = entry.0.intersect(&conflict.required);
            entry.1.push(conflict.clone());
        }

        for dep_name in buckets.keys().cloned().collect::<Vec<_>>() {
            let mut combined = buckets[&dep_name].0.clone();
            for (_, node) in map.iter() {
                if let Some(spec) = node.dependencies.get(&dep_name) {
                    combined = combined.intersect(spec);
                }
            }
            buckets.get_mut(&dep_name).unwrap().0 = combined;
        }

        buckets
    }

    /// Steps 2-4: fetch candidates, filter by the combined set, rank.
    async fn resolve_bucket(
        &self,
        dep_name: &str,
        combined: &SpecifierSet,
        map: &DependencyMap,
    ) -> Result<Option<Version>> {
        let candidates = self.index.versions(dep_name).await?;
        let mut satisfying: Vec<Version> = candidates
            .into_iter()
            .filter(|v| satisfies(v, combined))
            .collect();

        if satisfying.is_empty() {
            return Ok(None);
        }

        let mut scored = Vec::with_capacity(satisfying.len());
        for candidate in satisfying.drain(..) {
            let compatibility = self.compatibility_score(dep_name, &candidate, map).await?;
            scored.push((compatibility, candidate));
        }

        // Rank by fewest new conflicts first, then prefer the newest
        // satisfying version (§4.5 step 4: max-compatibility dominates;
        // among equally compatible candidates the newest wins).
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| compare_desc(&a.1, &b.1)));

        debug!("'{}' ranked {} satisfying candidates", dep_name, scored.len());
        Ok(scored.into_iter().next().map(|(_, v)| v))
    }

    /// Counts how many currently-installed edges the candidate's own
    /// requirements would break — the over-approximation of "new conflicts"
    /// described in §4.5 step 4.1.
    async fn compatibility_score(&self, dep_name: &str, candidate: &Version, map: &DependencyMap) -> Result<u64> {
        let requires = self.index.requires(dep_name, candidate).await?;
        let mut broken = 0u64;

        for raw in requires {
            let Some((req_name, req_spec)) = parse_requirement_string(&raw) else {
                continue;
            };
            if let Some(node) = map.get(&req_name) {
                if !satisfies(&node.installed_version, &req_spec) {
                    broken += 1;
                }
            }
        }

        Ok(broken)
    }

    /// Step 5: order items so that a package with no dependency on another
    /// item in the plan is applied first. Cycles break on name order.
    async fn topological_order(&self, items: Vec<ResolutionItem>, _map: &DependencyMap) -> Vec<ResolutionItem> {
        let names: BTreeSet<String> = items.iter().map(|i| i.package_name.clone()).collect();
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for item in &items {
            let mut deps = BTreeSet::new();
            if let Ok(requires) = self.index.requires(&item.package_name, &item.target_version).await {
                for raw in requires {
                    if let Some((req_name, _)) = parse_requirement_string(&raw) {
                        if names.contains(&req_name) && req_name != item.package_name {
                            deps.insert(req_name);
                        }
                    }
                }
            }
            edges.insert(item.package_name.clone(), deps);
        }

        let mut by_name: BTreeMap<String, ResolutionItem> =
            items.into_iter().map(|i| (i.package_name.clone(), i)).collect();
        let mut ordered = Vec::with_capacity(by_name.len());
        let mut placed: BTreeSet<String> = BTreeSet::new();

        while !by_name.is_empty() {
            let ready: Vec<String> = by_name
                .keys()
                .filter(|name| edges[*name].iter().all(|dep| placed.contains(dep)))
                .cloned()
                .collect();

            let next: Vec<String> = if ready.is_empty() {
                // cycle: break with name order among whatever remains
                by_name.keys().cloned().collect()
            } else {
                ready
            };

            for name in next {
                if let Some(item) = by_name.remove(&name) {
                    placed.insert(name);
                    ordered.push(item);
                }
            }
        }

        ordered
    }

    /// Step 6: re-run detection with installed versions virtually replaced
    /// by the plan's chosen targets; drop any item whose target introduced
    /// a fresh conflict elsewhere.
    fn validate(&self, items: Vec<ResolutionItem>, map: &DependencyMap) -> (Vec<ResolutionItem>, Vec<UnsolvableBucket>) {
        let mut virtual_map = map.clone();
        for item in &items {
            virtual_map = virtual_map.with_installed_version(&item.package_name, item.target_version.clone());
        }

        let new_conflicts = self.detector.detect_conflicts(&virtual_map);
        let regressed: BTreeSet<String> = new_conflicts.iter().map(|c| c.dep_name.clone()).collect();

        let mut kept = Vec::new();
        let mut unsolvable = Vec::new();

        for item in items {
            if regressed.contains(&item.package_name) {
                warn!("'{}' introduced a new conflict; removing from plan", item.package_name);
                let offending: Vec<Conflict> = new_conflicts
                    .iter()
                    .filter(|c| c.dep_name == item.package_name)
                    .cloned()
                    .collect();
                unsolvable.push(UnsolvableBucket {
                    package_name: item.package_name.clone(),
                    combined: SpecifierSet::empty(),
                    conflicts: offending,
                });
            } else {
                kept.push(item);
            }
        }

        (kept, unsolvable)
    }
}
