use super::{caf_prefix, diagnostics_enabled, ResourceKind};
use crate::cloud::models::EventHubNamespaceProperties;
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type Namespace = ArmResource<EventHubNamespaceProperties>;

/// Event Hub namespaces.
pub struct EventHubNamespaces;

fn namespace_sla(ns: &Namespace) -> &'static str {
    match ns.sku_name() {
        Some(sku) if sku.contains("Basic") => "99.95%",
        _ => "99.99%",
    }
}

impl ResourceKind for EventHubNamespaces {
    type Properties = EventHubNamespaceProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.EventHub/namespaces";
    const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

    fn recommendations() -> Vec<Recommendation<Namespace>> {
        vec![
            Recommendation {
                id: "evh-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "Event Hub Namespace should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/event-hubs/monitor-event-hubs#collection-and-routing",
                detailed: false,
            },
            Recommendation {
                id: "evh-002",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Event Hub Namespace should have availability zones enabled",
                eval: |ns, _| {
                    let zones = ns.properties.zone_redundant.unwrap_or(false);
                    Outcome::with_detail(!zones, zones.to_string())
                },
                url: "https://learn.microsoft.com/en-us/azure/event-hubs/event-hubs-premium-overview#high-availability-with-availability-zones",
                detailed: false,
            },
            Recommendation {
                id: "evh-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Event Hub Namespace should have a SLA",
                eval: |ns, _| Outcome::info(namespace_sla(ns)),
                url: "https://www.azure.cn/en-us/support/sla/event-hubs/",
                detailed: false,
            },
            Recommendation {
                id: "evh-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "Event Hub Namespace should have private endpoints enabled",
                eval: |ns, _| {
                    let pe = !ns.properties.private_endpoint_connections.is_empty();
                    Outcome::with_detail(!pe, pe.to_string())
                },
                url: "https://learn.microsoft.com/en-us/azure/event-hubs/network-security",
                detailed: false,
            },
            Recommendation {
                id: "evh-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Event Hub Namespace SKU",
                eval: |ns, _| match ns.sku_name() {
                    Some(sku) => Outcome::info(sku),
                    None => Outcome::missing("sku.name"),
                },
                url: "https://learn.microsoft.com/en-us/azure/event-hubs/compare-tiers",
                detailed: false,
            },
            Recommendation {
                id: "evh-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "Event Hub Namespace Name should comply with naming conventions",
                eval: |ns, _| caf_prefix(ns, "evh"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Subscription;
    use crate::context::{DiagnosticsSettingsIndex, ScanContext};
    use crate::rules::{RecommendationEngine, RowStatus};
    use serde_json::json;

    const NS_ID: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.EventHub/namespaces/evh-orders";

    fn namespace(sku: &str) -> Namespace {
        serde_json::from_value(json!({
            "id": NS_ID,
            "name": "evh-orders",
            "type": EventHubNamespaces::RESOURCE_TYPE,
            "sku": { "name": sku, "tier": sku },
            "properties": { "zoneRedundant": true }
        }))
        .unwrap()
    }

    fn evaluate(ns: &Namespace, diagnostics: &[&str]) -> Vec<(String, RowStatus, String)> {
        let ctx = ScanContext::new(
            Subscription {
                id: "sub".into(),
                name: String::new(),
            },
            DiagnosticsSettingsIndex::from_resource_ids(diagnostics),
        );
        RecommendationEngine
            .evaluate(&EventHubNamespaces::recommendations(), ns, &ctx)
            .into_iter()
            .map(|r| (r.recommendation_id, r.status, r.detail))
            .collect()
    }

    #[test]
    fn basic_sku_sla() {
        let results = evaluate(&namespace("Basic"), &[]);
        assert_eq!(
            results[2],
            ("evh-003".to_string(), RowStatus::Passed, "99.95%".to_string())
        );
    }

    #[test]
    fn other_skus_sla() {
        for sku in ["Standard", "Premium"] {
            let results = evaluate(&namespace(sku), &[]);
            assert_eq!(results[2].1, RowStatus::Passed);
            assert_eq!(results[2].2, "99.99%");
        }
    }

    #[test]
    fn diagnostics_lookup_ignores_casing() {
        let upper = NS_ID.to_uppercase();
        let results = evaluate(&namespace("Standard"), &[upper.as_str()]);
        assert_eq!(results[0].1, RowStatus::Passed);

        let results = evaluate(&namespace("Standard"), &[]);
        assert_eq!(results[0].1, RowStatus::Broken);
    }

    #[test]
    fn no_private_endpoints_is_broken() {
        let results = evaluate(&namespace("Premium"), &[]);
        assert_eq!(
            results[3],
            ("evh-004".to_string(), RowStatus::Broken, "false".to_string())
        );
        assert_eq!(results[1].1, RowStatus::Passed);
        assert_eq!(results[5].1, RowStatus::Passed);
    }
}
