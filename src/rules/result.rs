use serde::{Deserialize, Serialize};

use super::{Category, Impact, Outcome, Recommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Passed,
    Broken,
    /// The rule could not be decided; reported as broken.
    Indeterminate,
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Broken => write!(f, "broken"),
            Self::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Engine output for one rule against one resource, before location
/// metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendation_id: String,
    pub category: Category,
    pub impact: Impact,
    pub description: String,
    pub url: String,
    pub status: RowStatus,
    pub detail: String,
}

impl RecommendationResult {
    pub fn new<R>(rule: &Recommendation<R>, outcome: Outcome) -> Self {
        let (status, detail) = match outcome {
            Outcome::Passed(detail) => (RowStatus::Passed, detail),
            Outcome::Broken(detail) => (RowStatus::Broken, detail),
            Outcome::Indeterminate(reason) => (RowStatus::Indeterminate, reason),
        };
        Self {
            recommendation_id: rule.id.to_string(),
            category: rule.category,
            impact: rule.impact,
            description: rule.description.to_string(),
            url: rule.url.to_string(),
            status,
            detail,
        }
    }

    pub fn broken(&self) -> bool {
        self.status != RowStatus::Passed
    }
}

/// Where a resource lives; stamped onto every row produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStamp {
    pub subscription_id: String,
    pub subscription_name: String,
    pub resource_group: String,
    pub resource_name: String,
    pub resource_type: String,
    pub location: String,
}

/// One (resource, rule) evaluation outcome, the unit handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultRow {
    pub subscription_id: String,
    pub subscription_name: String,
    pub resource_group: String,
    pub resource_name: String,
    pub resource_type: String,
    pub location: String,
    pub recommendation_id: String,
    pub category: Category,
    pub impact: Impact,
    pub description: String,
    pub url: String,
    pub status: RowStatus,
    pub broken: bool,
    pub detail: String,
}

impl ResultRow {
    pub fn stamped(stamp: &RowStamp, result: RecommendationResult) -> Self {
        Self {
            subscription_id: stamp.subscription_id.clone(),
            subscription_name: stamp.subscription_name.clone(),
            resource_group: stamp.resource_group.clone(),
            resource_name: stamp.resource_name.clone(),
            resource_type: stamp.resource_type.clone(),
            location: stamp.location.clone(),
            broken: result.broken(),
            recommendation_id: result.recommendation_id,
            category: result.category,
            impact: result.impact,
            description: result.description,
            url: result.url,
            status: result.status,
            detail: result.detail,
        }
    }

    /// Key used for report ordering: subscription, resource group,
    /// resource type, resource name (case-insensitive).
    pub fn sort_key(&self) -> (String, String, String, String) {
        (
            self.subscription_id.to_ascii_lowercase(),
            self.resource_group.to_ascii_lowercase(),
            self.resource_type.to_ascii_lowercase(),
            self.resource_name.to_ascii_lowercase(),
        )
    }
}
