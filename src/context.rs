//! Per-subscription lookups shared by every scanner.
//!
//! A [`ScanContext`] is built before any resource-type scan starts and is
//! only read afterwards, so scanners share it by reference across worker
//! threads without locking.

use std::collections::HashSet;

use crate::cloud::{collect_pages, CancellationToken, CloudClient, Subscription};
use crate::error::Result;

/// Resource ids (lower-cased) that have at least one diagnostic setting.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSettingsIndex {
    resources: HashSet<String>,
}

impl DiagnosticsSettingsIndex {
    /// Page through every diagnostic setting in the subscription once.
    pub fn build(
        client: &dyn CloudClient,
        subscription_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let settings = collect_pages(cancel, |next| {
            client.list_diagnostic_settings(subscription_id, next)
        })?;

        let mut skipped = 0usize;
        let resources: HashSet<String> = settings
            .iter()
            .filter_map(|s| {
                let owner = s.resource_id();
                if owner.is_none() {
                    skipped += 1;
                }
                owner
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(
                subscription = subscription_id,
                skipped,
                "ignored diagnostic settings without an owning resource id"
            );
        }
        tracing::debug!(
            subscription = subscription_id,
            resources = resources.len(),
            "diagnostics settings index built"
        );

        Ok(Self { resources })
    }

    pub fn from_resource_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            resources: ids
                .into_iter()
                .map(|id| id.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Case-insensitive; unknown ids mean "no diagnostics configured".
    pub fn has_diagnostics(&self, resource_id: &str) -> bool {
        self.resources.contains(&resource_id.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Read-only lookups for one subscription's scan.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub subscription: Subscription,
    pub diagnostics: DiagnosticsSettingsIndex,
    /// Enables recommendations marked as detailed.
    pub detailed: bool,
}

impl ScanContext {
    pub fn build(
        client: &dyn CloudClient,
        subscription: &Subscription,
        detailed: bool,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let diagnostics = DiagnosticsSettingsIndex::build(client, &subscription.id, cancel)?;
        Ok(Self {
            subscription: subscription.clone(),
            diagnostics,
            detailed,
        })
    }

    pub fn new(subscription: Subscription, diagnostics: DiagnosticsSettingsIndex) -> Self {
        Self {
            subscription,
            diagnostics,
            detailed: false,
        }
    }
}
