//! Offline inventory client.
//!
//! Serves a JSON export of an account through the same paged, fallible
//! [`CloudClient`] contract a live client would use. Exports may carry
//! `faults` that make a given listing fail with a provider error, which
//! is how partial-coverage behaviour is reproduced offline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    resource_group_from_id, AdvisorRecommendation, CloudClient, DiagnosticSetting, Page, Scope,
    Subscription,
};
use crate::error::{ApiError, Result, ReviewError};

/// Top-level inventory document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    /// Items per page served by every listing.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionInventory>,
}

fn default_page_size() -> usize {
    50
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            subscriptions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInventory {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Resource groups that exist even when they hold no resources.
    #[serde(default)]
    pub resource_groups: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Value>,
    #[serde(default)]
    pub diagnostic_settings: Vec<DiagnosticSetting>,
    #[serde(default)]
    pub advisor: Vec<AdvisorRecommendation>,
    #[serde(default)]
    pub faults: Vec<Fault>,
}

/// A listing that fails instead of returning data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    pub operation: Operation,
    /// Restrict to one resource type (resource listings only).
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Restrict to one resource group (resource listings only).
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(flatten)]
    pub error: ApiError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ListResourceGroups,
    ListResources,
    ListDiagnosticSettings,
    ListAdvisorRecommendations,
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReviewError::Inventory(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let inventory: Inventory = serde_json::from_str(content)?;
        Ok(inventory)
    }
}

/// [`CloudClient`] backed by an [`Inventory`].
#[derive(Debug, Clone)]
pub struct InventoryClient {
    inventory: Inventory,
}

impl InventoryClient {
    pub fn new(inventory: Inventory) -> Self {
        Self { inventory }
    }

    fn subscription(&self, subscription_id: &str) -> Result<&SubscriptionInventory> {
        self.inventory
            .subscriptions
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(subscription_id))
            .ok_or_else(|| {
                ApiError::new(
                    404,
                    "SubscriptionNotFound",
                    format!("subscription '{subscription_id}' could not be found"),
                )
                .into()
            })
    }

    fn check_faults(
        sub: &SubscriptionInventory,
        operation: Operation,
        resource_type: Option<&str>,
        resource_group: Option<&str>,
    ) -> Result<()> {
        let matches = |filter: &Option<String>, value: Option<&str>| match (filter, value) {
            (None, _) => true,
            (Some(f), Some(v)) => f.eq_ignore_ascii_case(v),
            (Some(_), None) => false,
        };

        match sub.faults.iter().find(|f| {
            f.operation == operation
                && matches(&f.resource_type, resource_type)
                && matches(&f.resource_group, resource_group)
        }) {
            Some(fault) => Err(fault.error.clone().into()),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: &[T], next_link: Option<&str>) -> Result<Page<T>> {
        let offset = match next_link {
            None => 0,
            Some(link) => link
                .strip_prefix("offset=")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    ReviewError::from(ApiError::new(
                        400,
                        "InvalidNextLink",
                        format!("malformed next link '{link}'"),
                    ))
                })?,
        };
        let size = self.inventory.page_size.max(1);
        let end = offset.saturating_add(size).min(items.len());
        let slice = items.get(offset..end).unwrap_or_default();
        let next_link = (end < items.len()).then(|| format!("offset={end}"));

        Ok(Page {
            items: slice.to_vec(),
            next_link,
        })
    }
}

impl CloudClient for InventoryClient {
    fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        Ok(self
            .inventory
            .subscriptions
            .iter()
            .map(|s| Subscription {
                id: s.id.clone(),
                name: s.name.clone(),
            })
            .collect())
    }

    fn list_resource_groups(&self, subscription_id: &str) -> Result<Vec<String>> {
        let sub = self.subscription(subscription_id)?;
        Self::check_faults(sub, Operation::ListResourceGroups, None, None)?;

        let mut groups: Vec<String> = Vec::new();
        let derived = sub
            .resources
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_str))
            .map(resource_group_from_id);
        for group in sub.resource_groups.iter().cloned().chain(derived) {
            if !group.is_empty() && !groups.iter().any(|g| g.eq_ignore_ascii_case(&group)) {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    fn list_resources(
        &self,
        scope: &Scope,
        resource_type: &str,
        next_link: Option<&str>,
    ) -> Result<Page<Value>> {
        let sub = self.subscription(scope.subscription_id())?;
        Self::check_faults(
            sub,
            Operation::ListResources,
            Some(resource_type),
            scope.resource_group(),
        )?;

        let matching: Vec<Value> = sub
            .resources
            .iter()
            .filter(|r| {
                r.get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case(resource_type))
            })
            .filter(|r| match scope.resource_group() {
                None => true,
                Some(group) => r
                    .get("id")
                    .and_then(Value::as_str)
                    .is_some_and(|id| resource_group_from_id(id).eq_ignore_ascii_case(group)),
            })
            .cloned()
            .collect();

        self.page(&matching, next_link)
    }

    fn list_diagnostic_settings(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<Page<DiagnosticSetting>> {
        let sub = self.subscription(subscription_id)?;
        Self::check_faults(sub, Operation::ListDiagnosticSettings, None, None)?;
        self.page(&sub.diagnostic_settings, next_link)
    }

    fn list_advisor_recommendations(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<Page<AdvisorRecommendation>> {
        let sub = self.subscription(subscription_id)?;
        Self::check_faults(sub, Operation::ListAdvisorRecommendations, None, None)?;
        self.page(&sub.advisor, next_link)
    }
}
