//! Provider-generated recommendations, reported alongside the rule tables.

use serde::{Deserialize, Serialize};

use crate::cloud::{collect_pages, AdvisorRecommendation, ScannerConfig};
use crate::error::{Result, ReviewError};

/// One provider recommendation for an impacted resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvisorResult {
    pub subscription_id: String,
    pub subscription_name: String,
    pub name: String,
    pub resource_type: String,
    pub category: String,
    pub description: String,
    pub potential_benefits: String,
    pub risk: String,
    pub learn_more_link: String,
}

impl AdvisorResult {
    fn from_recommendation(config: &ScannerConfig, rec: AdvisorRecommendation) -> Self {
        let p = rec.properties;
        let description = p
            .short_description
            .and_then(|d| d.problem.or(d.solution))
            .unwrap_or_default();
        Self {
            subscription_id: config.subscription.id.clone(),
            subscription_name: config.subscription.name.clone(),
            name: p.impacted_value.unwrap_or_default(),
            resource_type: p.impacted_field.unwrap_or_default(),
            category: p.category.unwrap_or_default(),
            description,
            potential_benefits: p.potential_benefits.unwrap_or_default(),
            risk: p.risk.unwrap_or_default(),
            learn_more_link: p.learn_more_link.unwrap_or_default(),
        }
    }

    pub fn sort_key(&self) -> (String, String, String, String) {
        (
            self.subscription_id.to_ascii_lowercase(),
            self.resource_type.to_ascii_lowercase(),
            self.name.to_ascii_lowercase(),
            self.category.to_ascii_lowercase(),
        )
    }
}

/// Lists advisor recommendations for one subscription.
#[derive(Debug, Default)]
pub struct AdvisorScanner {
    config: Option<ScannerConfig>,
}

impl AdvisorScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, config: &ScannerConfig) -> Result<()> {
        if config.subscription.id.trim().is_empty() {
            return Err(ReviewError::Configuration(
                "advisor: subscription id is empty".into(),
            ));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    pub fn scan(&self) -> Result<Vec<AdvisorResult>> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ReviewError::Configuration("advisor: scan called before init".into()))?;

        tracing::info!(subscription = %config.subscription.id, "scanning advisor recommendations");

        let listed = collect_pages(&config.cancel, |next| {
            config
                .client
                .list_advisor_recommendations(&config.subscription.id, next)
        })?;

        Ok(listed
            .into_iter()
            .map(|rec| AdvisorResult::from_recommendation(config, rec))
            .collect())
    }
}
