pub mod policy;
pub mod result;

use serde::{Deserialize, Serialize};

use crate::context::ScanContext;

pub use result::{RecommendationResult, ResultRow, RowStamp, RowStatus};

/// Predicate signature shared by every rule table.
pub type Predicate<R> = fn(&R, &ScanContext) -> Outcome;

/// A best-practice rule evaluated against one resource of type `R`.
pub struct Recommendation<R> {
    /// Globally unique rule identifier (e.g., "aks-002").
    pub id: &'static str,
    /// Resource type this rule targets.
    pub resource_type: &'static str,
    pub category: Category,
    pub impact: Impact,
    pub description: &'static str,
    pub eval: Predicate<R>,
    /// Documentation link.
    pub url: &'static str,
    /// Only evaluated when the scan runs in detailed mode.
    pub detailed: bool,
}

impl<R> Recommendation<R> {
    pub fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: self.id.to_string(),
            resource_type: self.resource_type.to_string(),
            category: self.category,
            impact: self.impact,
            description: self.description.to_string(),
            url: self.url.to_string(),
            detailed: self.detailed,
        }
    }
}

impl<R> Clone for Recommendation<R> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<R> std::fmt::Debug for Recommendation<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommendation")
            .field("id", &self.id)
            .field("resource_type", &self.resource_type)
            .field("impact", &self.impact)
            .finish_non_exhaustive()
    }
}

/// What a predicate concluded about one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rule satisfied; the detail carries context such as a SKU or SLA.
    Passed(String),
    /// Rule violated.
    Broken(String),
    /// A field the rule depends on was not populated.
    Indeterminate(String),
}

impl Outcome {
    pub fn broken_if(broken: bool) -> Self {
        Self::with_detail(broken, String::new())
    }

    pub fn with_detail(broken: bool, detail: impl Into<String>) -> Self {
        if broken {
            Self::Broken(detail.into())
        } else {
            Self::Passed(detail.into())
        }
    }

    /// Informational result: never broken, detail only.
    pub fn info(detail: impl Into<String>) -> Self {
        Self::Passed(detail.into())
    }

    pub fn missing(field: &str) -> Self {
        Self::Indeterminate(format!("{field} not reported"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Monitoring,
    HighAvailability,
    Security,
    Governance,
    Performance,
    OperationalExcellence,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monitoring => write!(f, "Monitoring and Alerting"),
            Self::HighAvailability => write!(f, "High Availability"),
            Self::Security => write!(f, "Security"),
            Self::Governance => write!(f, "Governance"),
            Self::Performance => write!(f, "Scalability"),
            Self::OperationalExcellence => write!(f, "Operational Excellence"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Rule description without the predicate, used for `list-rules` output
/// and registry validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub id: String,
    pub resource_type: String,
    pub category: Category,
    pub impact: Impact,
    pub description: String,
    pub url: String,
    pub detailed: bool,
}

/// Runs a rule table against one resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    /// One result per rule, in table order. Each predicate sees only the
    /// resource and the read-only context.
    pub fn evaluate<R>(
        &self,
        rules: &[Recommendation<R>],
        resource: &R,
        ctx: &ScanContext,
    ) -> Vec<RecommendationResult> {
        rules
            .iter()
            .map(|rule| RecommendationResult::new(rule, (rule.eval)(resource, ctx)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Subscription;
    use crate::context::DiagnosticsSettingsIndex;

    struct Widget {
        size: Option<u32>,
    }

    fn rule(id: &'static str, eval: Predicate<Widget>) -> Recommendation<Widget> {
        Recommendation {
            id,
            resource_type: "Test/widgets",
            category: Category::Performance,
            impact: Impact::Medium,
            description: "test rule",
            eval,
            url: "https://example.com/docs",
            detailed: false,
        }
    }

    fn ctx() -> ScanContext {
        ScanContext::new(
            Subscription {
                id: "sub".into(),
                name: "Sub".into(),
            },
            DiagnosticsSettingsIndex::default(),
        )
    }

    #[test]
    fn one_result_per_rule_in_table_order() {
        let rules = vec![
            rule("w-003", |_, _| Outcome::broken_if(true)),
            rule("w-001", |w, _| Outcome::info(format!("{:?}", w.size))),
            rule("w-002", |w, _| match w.size {
                Some(s) => Outcome::broken_if(s > 10),
                None => Outcome::missing("size"),
            }),
        ];
        let results = RecommendationEngine.evaluate(&rules, &Widget { size: None }, &ctx());

        let ids: Vec<_> = results.iter().map(|r| r.recommendation_id.as_str()).collect();
        assert_eq!(ids, vec!["w-003", "w-001", "w-002"]);
        assert_eq!(results[0].status, RowStatus::Broken);
        assert_eq!(results[1].status, RowStatus::Passed);
        assert_eq!(results[1].detail, "None");
        assert_eq!(results[2].status, RowStatus::Indeterminate);
        assert!(results[2].broken());
    }

    #[test]
    fn empty_table_yields_nothing() {
        let results = RecommendationEngine.evaluate(&[], &Widget { size: Some(1) }, &ctx());
        assert!(results.is_empty());
    }

    #[test]
    fn lenient_impact_parsing() {
        assert_eq!(Impact::from_str_lenient("MED"), Some(Impact::Medium));
        assert_eq!(Impact::from_str_lenient("critical"), None);
        assert!(Impact::High > Impact::Low);
    }
}
