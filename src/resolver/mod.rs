//! Conflict detection and resolution planning (C4/C5).

mod conflict_detector;
mod resolver_impl;

pub use conflict_detector::ConflictDetector;
pub use resolver_impl::DependencyResolverImpl;

use crate::core::{Conflict, DependencyMap, IndexClient, Plan, Result};

/// Runs detection and resolution in one pass: detect conflicts against
/// `map`, then compute a plan using `index` for candidate lookups.
pub async fn detect_and_resolve<I: IndexClient>(map: &DependencyMap, index: &I) -> Result<(Vec<Conflict>, Plan)> {
    let conflicts = ConflictDetector::new().detect_conflicts(map);
    let plan = DependencyResolverImpl::new(index).resolve(&conflicts, map).await?;
    Ok((conflicts, plan))
}
