//! Plan execution (C6): enacts a [`Plan`] against a [`PackageManager`]
//! adapter, one item at a time, best-effort.

use tracing::{info, warn};

use crate::core::{CommandOutcome, PackageManager, Plan, ResolutionItem};

/// Outcome of applying a single plan item.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub package_name: String,
    pub succeeded: bool,
    pub detail: String,
}

/// Summary of an executed plan.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl ExecutionReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }
}

/// Applies plans by invoking a package-manager adapter once per item, in
/// plan order, continuing past per-item failures.
pub struct Executor<'a, M: PackageManager> {
    manager: &'a M,
    dry_run: bool,
}

impl<'a, M: PackageManager> Executor<'a, M> {
    pub fn new(manager: &'a M, dry_run: bool) -> Self {
        Self { manager, dry_run }
    }

    pub async fn execute(&self, plan: &Plan) -> ExecutionReport {
        let mut outcomes = Vec::with_capacity(plan.items.len());

        for item in &plan.items {
            let outcome = self.apply_item(item).await;
            if !outcome.succeeded {
                warn!("item '{}' failed: {}", outcome.package_name, outcome.detail);
            }
            outcomes.push(outcome);
        }

        info!("executed {} plan items", plan.items.len());
        ExecutionReport { outcomes }
    }

    async fn apply_item(&self, item: &ResolutionItem) -> ItemOutcome {
        if self.dry_run {
            let detail = format!(
                "would install {} {} (currently {})",
                item.package_name,
                item.target_version,
                item.current_version.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "not installed".to_string())
            );
            info!("{}", detail);
            return ItemOutcome { package_name: item.package_name.clone(), succeeded: true, detail };
        }

        if item.current_version.is_some() {
            match self.manager.uninstall(&item.package_name).await {
                Ok(outcome) if !outcome.is_success() => {
                    return ItemOutcome {
                        package_name: item.package_name.clone(),
                        succeeded: false,
                        detail: format!("uninstall exited {}: {}", outcome.status, outcome.output),
                    };
                }
                Err(e) => {
                    return ItemOutcome {
                        package_name: item.package_name.clone(),
                        succeeded: false,
                        detail: format!("uninstall failed: {}", e),
                    };
                }
                Ok(_) => {}
            }
        }

        match self.manager.install(&item.package_name, &item.target_version).await {
            Ok(outcome) if outcome.is_success() => ItemOutcome {
                package_name: item.package_name.clone(),
                succeeded: true,
                detail: format!("installed {} {}", item.package_name, item.target_version),
            },
            Ok(outcome) => ItemOutcome {
                package_name: item.package_name.clone(),
                succeeded: false,
                detail: format!("install exited {}: {}", outcome.status, outcome.output),
            },
            Err(e) => ItemOutcome {
                package_name: item.package_name.clone(),
                succeeded: false,
                detail: format!("install failed: {}", e),
            },
        }
    }
}
