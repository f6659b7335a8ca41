use super::{caf_prefix, diagnostics_enabled, has_tags, ResourceKind};
use crate::cloud::models::ManagedClusterProperties;
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type ManagedCluster = ArmResource<ManagedClusterProperties>;

/// Managed Kubernetes clusters.
pub struct ManagedClusters;

/// No agent pool is confined to a single zone.
fn zone_redundant(cluster: &ManagedCluster) -> bool {
    cluster
        .properties
        .agent_pool_profiles
        .iter()
        .all(|p| p.availability_zones.as_ref().is_some_and(|z| z.len() > 1))
}

/// Pricing tier, defaulting to Free when the cluster reports none.
fn tier(cluster: &ManagedCluster) -> &str {
    cluster.sku_tier().unwrap_or("Free")
}

/// Uptime SLA implied by tier and zones; `None` on the free tier.
fn sla(cluster: &ManagedCluster) -> Option<&'static str> {
    if tier(cluster).contains("Free") {
        None
    } else if zone_redundant(cluster) {
        Some("99.95%")
    } else {
        Some("99.9%")
    }
}

impl ResourceKind for ManagedClusters {
    type Properties = ManagedClusterProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.ContainerService/managedClusters";
    const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

    fn recommendations() -> Vec<Recommendation<ManagedCluster>> {
        vec![
            Recommendation {
                id: "aks-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "AKS Cluster should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/aks/monitor-aks#collect-resource-logs",
                detailed: false,
            },
            Recommendation {
                id: "aks-002",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "AKS Cluster should have availability zones enabled",
                eval: |c, _| Outcome::broken_if(!zone_redundant(c)),
                url: "https://learn.microsoft.com/en-us/azure/aks/availability-zones",
                detailed: false,
            },
            Recommendation {
                id: "aks-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "AKS Cluster should have an SLA",
                eval: |c, _| match sla(c) {
                    Some(sla) => Outcome::Passed(sla.into()),
                    None => Outcome::Broken("None".into()),
                },
                url: "https://learn.microsoft.com/en-us/azure/aks/free-standard-pricing-tiers#uptime-sla-terms-and-conditions",
                detailed: false,
            },
            Recommendation {
                id: "aks-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "AKS Cluster should be private",
                eval: |c, _| {
                    let private = c
                        .properties
                        .api_server_access_profile
                        .as_ref()
                        .and_then(|p| p.enable_private_cluster)
                        .unwrap_or(false);
                    Outcome::broken_if(!private)
                },
                url: "https://learn.microsoft.com/en-us/azure/aks/private-clusters",
                detailed: false,
            },
            Recommendation {
                id: "aks-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "AKS Production Cluster should use Standard SKU",
                eval: |c, _| {
                    let sku = tier(c);
                    Outcome::with_detail(sku == "Free", sku)
                },
                url: "https://learn.microsoft.com/en-us/azure/aks/free-standard-pricing-tiers",
                detailed: false,
            },
            Recommendation {
                id: "aks-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "AKS Name should comply with naming conventions",
                eval: |c, _| caf_prefix(c, "aks"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
            Recommendation {
                id: "aks-007",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::Medium,
                description: "AKS should integrate authentication with AAD (Managed)",
                eval: |c, _| {
                    let managed = c
                        .properties
                        .aad_profile
                        .as_ref()
                        .and_then(|p| p.managed)
                        .unwrap_or(false);
                    Outcome::broken_if(!managed)
                },
                url: "https://learn.microsoft.com/azure/aks/managed-azure-ad",
                detailed: false,
            },
            Recommendation {
                id: "aks-008",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::Medium,
                description: "AKS should be RBAC enabled",
                eval: |c, _| match c.properties.enable_rbac {
                    Some(rbac) => Outcome::broken_if(!rbac),
                    None => Outcome::missing("enableRBAC"),
                },
                url: "https://learn.microsoft.com/azure/aks/manage-azure-rbac",
                detailed: false,
            },
            Recommendation {
                id: "aks-009",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::Medium,
                description: "AKS should have local accounts disabled",
                eval: |c, _| {
                    Outcome::broken_if(c.properties.disable_local_accounts != Some(true))
                },
                url: "https://learn.microsoft.com/azure/aks/managed-aad#disable-local-accounts",
                detailed: false,
            },
            Recommendation {
                id: "aks-010",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::Medium,
                description: "AKS should have httpApplicationRouting disabled",
                eval: |c, _| {
                    let enabled = c
                        .properties
                        .addon_profiles
                        .get("httpApplicationRouting")
                        .and_then(|p| p.enabled)
                        .unwrap_or(false);
                    Outcome::broken_if(enabled)
                },
                url: "https://learn.microsoft.com/azure/aks/http-application-routing",
                detailed: false,
            },
            Recommendation {
                id: "aks-011",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Medium,
                description: "AKS should have Container Insights enabled",
                eval: |c, _| {
                    let enabled = c
                        .properties
                        .addon_profiles
                        .get("omsagent")
                        .and_then(|p| p.enabled)
                        .unwrap_or(false);
                    Outcome::broken_if(!enabled)
                },
                url: "https://learn.microsoft.com/azure/azure-monitor/insights/container-insights-overview",
                detailed: false,
            },
            Recommendation {
                id: "aks-012",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "AKS should have outbound type set to user defined routing",
                eval: |c, _| {
                    match c
                        .properties
                        .network_profile
                        .as_ref()
                        .and_then(|n| n.outbound_type.as_deref())
                    {
                        Some(outbound) => {
                            Outcome::with_detail(outbound != "userDefinedRouting", outbound)
                        }
                        None => Outcome::missing("networkProfile.outboundType"),
                    }
                },
                url: "https://learn.microsoft.com/azure/aks/limit-egress-traffic",
                detailed: false,
            },
            Recommendation {
                id: "aks-013",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Performance,
                impact: Impact::Medium,
                description: "AKS should avoid using kubenet network plugin",
                eval: |c, _| {
                    match c
                        .properties
                        .network_profile
                        .as_ref()
                        .and_then(|n| n.network_plugin.as_deref())
                    {
                        Some(plugin) => Outcome::with_detail(plugin == "kubenet", plugin),
                        None => Outcome::missing("networkProfile.networkPlugin"),
                    }
                },
                url: "https://learn.microsoft.com/azure/aks/operator-best-practices-network",
                detailed: false,
            },
            Recommendation {
                id: "aks-014",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::OperationalExcellence,
                impact: Impact::Medium,
                description: "AKS should have autoscaler enabled",
                eval: |c, _| {
                    let pools = &c.properties.agent_pool_profiles;
                    let autoscaled = !pools.is_empty()
                        && pools.iter().all(|p| p.enable_auto_scaling == Some(true));
                    Outcome::broken_if(!autoscaled)
                },
                url: "https://learn.microsoft.com/azure/aks/concepts-scale",
                detailed: false,
            },
            Recommendation {
                id: "aks-015",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "AKS should have tags",
                eval: |c, _| has_tags(c),
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

    const CLUSTER_ID: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ContainerService/managedClusters/aks-prod";

    fn cluster(tier: &str, zones: &[&[&str]]) -> ManagedCluster {
        let pools: Vec<_> = zones
            .iter()
            .enumerate()
            .map(|(i, z)| json!({ "name": format!("pool{i}"), "availabilityZones": z }))
            .collect();
        serde_json::from_value(json!({
            "id": CLUSTER_ID,
            "name": "aks-prod",
            "type": ManagedClusters::RESOURCE_TYPE,
            "location": "westeurope",
            "sku": { "name": "Base", "tier": tier },
            "properties": { "agentPoolProfiles": pools }
        }))
        .unwrap()
    }

    fn ctx(with_diagnostics: bool) -> ScanContext {
        let ids: Vec<&str> = if with_diagnostics { vec![CLUSTER_ID] } else { vec![] };
        ScanContext::new(
            Subscription {
                id: "sub".into(),
                name: "Sub".into(),
            },
            DiagnosticsSettingsIndex::from_resource_ids(ids),
        )
    }

    fn result(c: &ManagedCluster, id: &str, ctx: &ScanContext) -> (RowStatus, String) {
        let results =
            RecommendationEngine.evaluate(&ManagedClusters::recommendations(), c, ctx);
        assert_eq!(results.len(), 15);
        let r = results
            .into_iter()
            .find(|r| r.recommendation_id == id)
            .unwrap();
        (r.status, r.detail)
    }

    #[test]
    fn single_zone_pool_breaks_zones_and_lowers_sla() {
        let c = cluster("Standard", &[&["1"]]);
        assert_eq!(result(&c, "aks-002", &ctx(false)).0, RowStatus::Broken);
        assert_eq!(
            result(&c, "aks-003", &ctx(false)),
            (RowStatus::Passed, "99.9%".to_string())
        );
    }

    #[test]
    fn zone_redundant_pools_raise_sla() {
        let c = cluster("Standard", &[&["1", "2"], &["1", "2", "3"]]);
        assert_eq!(result(&c, "aks-002", &ctx(false)).0, RowStatus::Passed);
        assert_eq!(result(&c, "aks-003", &ctx(false)).1, "99.95%");
    }

    #[test]
    fn one_weak_pool_spoils_zone_redundancy() {
        let c = cluster("Standard", &[&["1", "2"], &[]]);
        assert_eq!(result(&c, "aks-002", &ctx(false)).0, RowStatus::Broken);
        assert_eq!(result(&c, "aks-003", &ctx(false)).1, "99.9%");
    }

    #[test]
    fn cluster_without_pools_counts_as_zone_redundant() {
        let c = cluster("Standard", &[]);
        assert_eq!(result(&c, "aks-002", &ctx(false)).0, RowStatus::Passed);
        assert_eq!(
            result(&c, "aks-003", &ctx(false)),
            (RowStatus::Passed, "99.95%".to_string())
        );
    }

    #[test]
    fn free_tier_has_no_sla() {
        let c = cluster("Free", &[&["1", "2"]]);
        assert_eq!(
            result(&c, "aks-003", &ctx(false)),
            (RowStatus::Broken, "None".to_string())
        );
        assert_eq!(result(&c, "aks-005", &ctx(false)).0, RowStatus::Broken);
    }

    #[test]
    fn diagnostics_come_from_the_index() {
        let c = cluster("Standard", &[&["1"]]);
        assert_eq!(result(&c, "aks-001", &ctx(true)).0, RowStatus::Passed);
        assert_eq!(result(&c, "aks-001", &ctx(false)).0, RowStatus::Broken);
    }

    #[test]
    fn missing_network_profile_is_indeterminate() {
        let c = cluster("Standard", &[&["1"]]);
        assert_eq!(result(&c, "aks-012", &ctx(false)).0, RowStatus::Indeterminate);
        assert_eq!(result(&c, "aks-008", &ctx(false)).0, RowStatus::Indeterminate);
    }
}
