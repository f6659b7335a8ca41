use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Impact, ResultRow};

/// Pass/fail decision after the ignore list and impact overrides are
/// applied to the result rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub total_rows: usize,
    pub broken_rows: usize,
    pub highest_impact: Option<Impact>,
    pub fail_threshold: Impact,
}

/// Policy configuration loaded from `.cloudreview.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Minimum impact of a broken recommendation that fails the run.
    #[serde(default = "default_fail_on")]
    pub fail_on: Impact,
    /// Recommendation IDs to ignore entirely.
    #[serde(default)]
    pub ignore_rules: HashSet<String>,
    /// Per-recommendation impact overrides.
    #[serde(default)]
    pub overrides: HashMap<String, Impact>,
}

fn default_fail_on() -> Impact {
    Impact::High
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            ignore_rules: HashSet::new(),
            overrides: HashMap::new(),
        }
    }
}

impl Policy {
    /// Evaluate rows against this policy and produce a verdict.
    pub fn evaluate(&self, rows: &[ResultRow]) -> PolicyVerdict {
        let effective = self.apply(rows);
        let broken: Vec<Impact> = effective
            .iter()
            .filter(|r| r.broken)
            .map(|r| r.impact)
            .collect();

        let highest = broken.iter().copied().max();
        let failed = broken.iter().any(|&impact| impact >= self.fail_on);

        PolicyVerdict {
            pass: !failed,
            total_rows: effective.len(),
            broken_rows: broken.len(),
            highest_impact: highest,
            fail_threshold: self.fail_on,
        }
    }

    /// Filter rows: remove ignored recommendations, apply overrides.
    pub fn apply(&self, rows: &[ResultRow]) -> Vec<ResultRow> {
        rows.iter()
            .filter(|r| !self.ignore_rules.contains(&r.recommendation_id))
            .map(|r| {
                let mut r = r.clone();
                if let Some(&impact) = self.overrides.get(&r.recommendation_id) {
                    r.impact = impact;
                }
                r
            })
            .collect()
    }
}
