use super::{caf_prefix, diagnostics_enabled, has_tags, ResourceKind};
use crate::cloud::models::ContainerGroupProperties;
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type ContainerGroup = ArmResource<ContainerGroupProperties>;

/// Container instance groups.
pub struct ContainerGroups;

impl ResourceKind for ContainerGroups {
    type Properties = ContainerGroupProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.ContainerInstance/containerGroups";
    const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

    fn recommendations() -> Vec<Recommendation<ContainerGroup>> {
        vec![
            Recommendation {
                id: "ci-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Container Instances should use availability zones",
                eval: |g, _| Outcome::with_detail(g.zones.is_empty(), g.zones.join(",")),
                url: "https://learn.microsoft.com/en-us/azure/container-instances/availability-zones",
                detailed: false,
            },
            Recommendation {
                id: "ci-002",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Container Instances should have a SLA",
                eval: |_, _| Outcome::info("99.9%"),
                url: "https://www.azure.cn/en-us/support/sla/container-instances/v1_0/index.html",
                detailed: false,
            },
            Recommendation {
                id: "ci-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "Container Instances should use private IP addresses",
                eval: |g, _| {
                    match g
                        .properties
                        .ip_address
                        .as_ref()
                        .and_then(|ip| ip.address_type.as_deref())
                    {
                        Some(kind) => Outcome::with_detail(kind != "Private", kind),
                        None => Outcome::broken_if(g.properties.subnet_ids.is_empty()),
                    }
                },
                url: "https://learn.microsoft.com/en-us/azure/container-instances/container-instances-vnet",
                detailed: false,
            },
            Recommendation {
                id: "ci-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Container Instances SKU",
                eval: |g, _| match g.properties.sku.as_deref() {
                    Some(sku) => Outcome::info(sku),
                    None => Outcome::missing("properties.sku"),
                },
                url: "https://learn.microsoft.com/en-us/azure/container-instances/container-instances-quotas",
                detailed: false,
            },
            Recommendation {
                id: "ci-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "Container Instances Name should comply with naming conventions",
                eval: |g, _| caf_prefix(g, "ci"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
            Recommendation {
                id: "ci-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "Container Instances should have tags",
                eval: |g, _| has_tags(g),
                url: "https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/tag-resources?tabs=json",
                detailed: false,
            },
            Recommendation {
                id: "ci-007",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "Container Instances should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/container-instances/container-instances-log-analytics",
                detailed: false,
            },
        ]
    }
}
