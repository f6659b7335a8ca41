use super::{caf_prefix, diagnostics_enabled, has_tags, ResourceKind};
use crate::cloud::models::SignalRProperties;
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type SignalR = ArmResource<SignalRProperties>;

/// SignalR realtime messaging services.
pub struct SignalRServices;

fn is_premium(s: &SignalR) -> bool {
    s.sku_tier()
        .or_else(|| s.sku_name())
        .is_some_and(|t| t.contains("Premium"))
}

impl ResourceKind for SignalRServices {
    type Properties = SignalRProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.SignalRService/SignalR";
    const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

    fn recommendations() -> Vec<Recommendation<SignalR>> {
        vec![
            Recommendation {
                id: "sigr-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "SignalR should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/azure-signalr/signalr-howto-diagnostic-logs",
                detailed: false,
            },
            Recommendation {
                id: "sigr-002",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "SignalR should have availability zones enabled",
                eval: |s, _| Outcome::broken_if(!is_premium(s)),
                url: "https://learn.microsoft.com/en-us/azure/azure-signalr/availability-zones",
                detailed: false,
            },
            Recommendation {
                id: "sigr-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "SignalR should have a SLA",
                eval: |s, _| match s.sku_tier().or_else(|| s.sku_name()) {
                    Some(t) if t.contains("Free") => Outcome::Broken("None".into()),
                    Some(_) if is_premium(s) => Outcome::info("99.95%"),
                    Some(_) => Outcome::info("99.9%"),
                    None => Outcome::missing("sku"),
                },
                url: "https://www.azure.cn/en-us/support/sla/signalr-service/",
                detailed: false,
            },
            Recommendation {
                id: "sigr-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "SignalR should have private endpoints enabled",
                eval: |s, _| {
                    Outcome::broken_if(s.properties.private_endpoint_connections.is_empty())
                },
                url: "https://learn.microsoft.com/en-us/azure/azure-signalr/howto-private-endpoints",
                detailed: false,
            },
            Recommendation {
                id: "sigr-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "SignalR SKU",
                eval: |s, _| match s.sku_name() {
                    Some(sku) => Outcome::info(sku),
                    None => Outcome::missing("sku.name"),
                },
                url: "https://azure.microsoft.com/en-us/pricing/details/signalr-service/",
                detailed: false,
            },
            Recommendation {
                id: "sigr-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "SignalR Name should comply with naming conventions",
                eval: |s, _| caf_prefix(s, "sigr"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
            Recommendation {
                id: "sigr-007",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "SignalR should have tags",
                eval: |s, _| has_tags(s),
                url: "https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/tag-resources?tabs=json",
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
    use crate::rules::RecommendationEngine;
    use serde_json::json;

    fn sla(sku: serde_json::Value) -> (bool, String) {
        let service: SignalR =
            serde_json::from_value(json!({ "name": "sigr-chat", "sku": sku })).unwrap();
        let ctx = ScanContext::new(
            Subscription {
                id: "sub".into(),
                name: String::new(),
            },
            DiagnosticsSettingsIndex::default(),
        );
        let results =
            RecommendationEngine.evaluate(&SignalRServices::recommendations(), &service, &ctx);
        (results[2].broken(), results[2].detail.clone())
    }

    #[test]
    fn sla_by_tier() {
        assert_eq!(
            sla(json!({ "name": "Free_F1", "tier": "Free" })),
            (true, "None".to_string())
        );
        assert_eq!(
            sla(json!({ "name": "Standard_S1", "tier": "Standard" })),
            (false, "99.9%".to_string())
        );
        assert_eq!(
            sla(json!({ "name": "Premium_P1", "tier": "Premium" })),
            (false, "99.95%".to_string())
        );
    }
}
