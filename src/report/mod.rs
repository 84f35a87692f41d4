//! Report formatting (C8): renders detection/resolution output as either a
//! human-readable summary or the authoritative JSON document consumed by
//! automation.

use serde::Serialize;

use crate::core::{Conflict, Plan, Result};

/// Summary counters attached to every JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub conflict_count: usize,
    pub resolvable_count: usize,
}

/// The full report: everything detection and resolution produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    pub conflicts: &'a [Conflict],
    pub plan: &'a [crate::core::ResolutionItem],
    pub unsolvable: &'a [crate::core::UnsolvableBucket],
    pub summary: Summary,
}

impl<'a> Report<'a> {
    pub fn new(conflicts: &'a [Conflict], plan: &'a Plan) -> Self {
        Self {
            conflicts,
            plan: &plan.items,
            unsolvable: &plan.unsolvable,
            summary: Summary {
                conflict_count: conflicts.len(),
                resolvable_count: plan.items.len(),
            },
        }
    }

    /// Canonical JSON document, the sole authoritative interface for
    /// automation (§4.8). Pretty-printed, single trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut s = serde_json::to_string_pretty(self).map_err(|e| crate::core::Error::Other(e.to_string()))?;
        s.push('\n');
        Ok(s)
    }

    /// Human-readable text layout for interactive use.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if self.conflicts.is_empty() {
            out.push_str("No conflicts detected.\n");
            return out;
        }

        out.push_str(&format!("Conflicts ({}):\n", self.conflicts.len()));
        for c in self.conflicts {
            let installed = c
                .installed_version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "not installed".to_string());
            out.push_str(&format!(
                "  {} requires {} {} -- installed: {} [{:?}]\n",
                c.parent_name, c.dep_name, c.required, installed, c.kind
            ));
        }

        if !self.plan.is_empty() {
            out.push_str(&format!("\nResolution plan ({} item(s)):\n", self.plan.len()));
            for item in self.plan {
                let from = item.current_version.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "none".to_string());
                out.push_str(&format!("  {}: {} -> {}\n", item.package_name, from, item.target_version));
            }
        }

        if !self.unsolvable.is_empty() {
            out.push_str(&format!("\nUnsolvable ({}):\n", self.unsolvable.len()));
            for bucket in self.unsolvable {
                out.push_str(&format!(
                    "  {}: no candidate satisfies {} ({} conflicting requirement(s))\n",
                    bucket.package_name,
                    bucket.combined,
                    bucket.conflicts.len()
                ));
            }
        }

        out.push_str(&format!(
            "\nSummary: {} conflict(s), {} resolvable\n",
            self.summary.conflict_count, self.summary.resolvable_count
        ));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConflictKind, ResolutionItem, UnsolvableBucket};
    use crate::core::version::{parse_specifier_set, parse_version};

    fn conflict() -> Conflict {
        Conflict {
            parent_name: "app".to_string(),
            parent_version: parse_version("1.0.0"),
            dep_name: "click".to_string(),
            installed_version: Some(parse_version("7.0.0")),
            required: parse_specifier_set(">=8.0"),
            kind: ConflictKind::VersionMismatch,
        }
    }

    #[test]
    fn empty_conflicts_render_as_clean() {
        let plan = Plan::empty();
        let report = Report::new(&[], &plan);
        assert_eq!(report.to_text(), "No conflicts detected.\n");
    }

    #[test]
    fn text_report_lists_conflicts_and_plan() {
        let conflicts = vec![conflict()];
        let plan = Plan {
            items: vec![ResolutionItem {
                package_name: "click".to_string(),
                current_version: Some(parse_version("7.0.0")),
                target_version: parse_version("8.5.0"),
                satisfies: conflicts.clone(),
            }],
            unsolvable: vec![],
        };
        let report = Report::new(&conflicts, &plan);
        let text = report.to_text();
        assert!(text.contains("Conflicts (1)"));
        assert!(text.contains("click: 7.0.0 -> 8.5.0"));
    }

    #[test]
    fn json_report_has_expected_shape() {
        let conflicts = vec![conflict()];
        let plan = Plan {
            items: vec![],
            unsolvable: vec![UnsolvableBucket {
                package_name: "click".to_string(),
                combined: parse_specifier_set(">=9.0,<8.0"),
                conflicts: conflicts.clone(),
            }],
        };
        let report = Report::new(&conflicts, &plan);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("summary").is_some());
        assert_eq!(value["summary"]["conflict_count"], 1);
        assert_eq!(value["summary"]["resolvable_count"], 0);
    }
}
