use super::{caf_prefix, diagnostics_enabled, has_tags, ResourceKind};
use crate::cloud::models::ScaleSetProperties;
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type ScaleSet = ArmResource<ScaleSetProperties>;

/// Virtual machine scale sets.
pub struct ScaleSets;

impl ResourceKind for ScaleSets {
    type Properties = ScaleSetProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.Compute/virtualMachineScaleSets";
    const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

    fn recommendations() -> Vec<Recommendation<ScaleSet>> {
        vec![
            Recommendation {
                id: "vmss-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "Virtual Machine Scale Set should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/azure-monitor/essentials/diagnostic-settings",
                detailed: false,
            },
            Recommendation {
                id: "vmss-002",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Virtual Machine Scale Set should have availability zones enabled",
                eval: |s, _| Outcome::with_detail(s.zones.len() < 2, s.zones.join(",")),
                url: "https://learn.microsoft.com/en-us/azure/virtual-machine-scale-sets/virtual-machine-scale-sets-use-availability-zones",
                detailed: false,
            },
            Recommendation {
                id: "vmss-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Virtual Machine Scale Set should have a SLA",
                eval: |s, _| {
                    let sla = if s.zones.len() > 1 { "99.99%" } else { "99.95%" };
                    Outcome::info(sla)
                },
                url: "https://www.azure.cn/en-us/support/sla/virtual-machines/",
                detailed: false,
            },
            Recommendation {
                id: "vmss-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::OperationalExcellence,
                impact: Impact::Medium,
                description: "Virtual Machine Scale Set should not use a manual upgrade policy",
                eval: |s, _| {
                    match s
                        .properties
                        .upgrade_policy
                        .as_ref()
                        .and_then(|p| p.mode.as_deref())
                    {
                        Some(mode) => Outcome::with_detail(mode.eq_ignore_ascii_case("Manual"), mode),
                        None => Outcome::missing("upgradePolicy.mode"),
                    }
                },
                url: "https://learn.microsoft.com/en-us/azure/virtual-machine-scale-sets/virtual-machine-scale-sets-upgrade-policy",
                detailed: false,
            },
            Recommendation {
                id: "vmss-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Performance,
                impact: Impact::Low,
                description: "Virtual Machine Scale Set SKU",
                eval: |s, _| match s.sku_name() {
                    Some(sku) => Outcome::info(sku),
                    None => Outcome::missing("sku.name"),
                },
                url: "https://learn.microsoft.com/en-us/azure/virtual-machines/sizes",
                detailed: false,
            },
            Recommendation {
                id: "vmss-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "Virtual Machine Scale Set Name should comply with naming conventions",
                eval: |s, _| caf_prefix(s, "vmss"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
            Recommendation {
                id: "vmss-007",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "Virtual Machine Scale Set should have tags",
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
    use crate::rules::{RecommendationEngine, RowStatus};
    use serde_json::json;

    #[test]
    fn zonal_scale_set() {
        let set: ScaleSet = serde_json::from_value(json!({
            "name": "vmss-web",
            "zones": ["1", "2", "3"],
            "sku": { "name": "Standard_D2s_v5", "capacity": 3 },
            "properties": { "upgradePolicy": { "mode": "Manual" } }
        }))
        .unwrap();
        let ctx = ScanContext::new(
            Subscription {
                id: "sub".into(),
                name: String::new(),
            },
            DiagnosticsSettingsIndex::default(),
        );
        let results: Vec<_> = RecommendationEngine
            .evaluate(&ScaleSets::recommendations(), &set, &ctx)
            .into_iter()
            .map(|r| (r.status, r.detail))
            .collect();

        assert_eq!(results[1], (RowStatus::Passed, "1,2,3".to_string()));
        assert_eq!(results[2], (RowStatus::Passed, "99.99%".to_string()));
        assert_eq!(results[3], (RowStatus::Broken, "Manual".to_string()));
        assert_eq!(results[5], (RowStatus::Passed, "true".to_string()));
        assert_eq!(results[6].0, RowStatus::Broken);
    }

    #[test]
    fn diagnostics_lookup_ignores_casing() {
        const ID: &str = "/subscriptions/sub/resourceGroups/rg-web/providers/Microsoft.Compute/virtualMachineScaleSets/vmss-web";
        let set: ScaleSet = serde_json::from_value(json!({ "id": ID, "name": "vmss-web" })).unwrap();
        let status = |ids: &[&str]| {
            let ctx = ScanContext::new(
                Subscription {
                    id: "sub".into(),
                    name: String::new(),
                },
                DiagnosticsSettingsIndex::from_resource_ids(ids),
            );
            let results = RecommendationEngine.evaluate(&ScaleSets::recommendations(), &set, &ctx);
            assert_eq!(results[0].recommendation_id, "vmss-001");
            results[0].status
        };

        let upper = ID.to_uppercase();
        assert_eq!(status(&[upper.as_str()]), RowStatus::Passed);
        assert_eq!(status(&[ID.to_lowercase().as_str()]), RowStatus::Passed);
        assert_eq!(status(&[]), RowStatus::Broken);
    }
}
