use super::{caf_prefix, diagnostics_enabled, has_tags, ResourceKind};
use crate::cloud::models::{NetworkSecurityGroupProperties, SecurityRule};
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type SecurityGroup = ArmResource<NetworkSecurityGroupProperties>;

/// Network security groups, listed once per subscription.
pub struct NetworkSecurityGroups;

const ANY_SOURCE: &[&str] = &["*", "Internet", "0.0.0.0/0", "Any"];

fn allows_inbound_from_anywhere(rule: &SecurityRule) -> bool {
    let p = &rule.properties;
    let eq = |field: &Option<String>, want: &str| {
        field
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case(want))
    };
    eq(&p.direction, "Inbound")
        && eq(&p.access, "Allow")
        && p
            .source_address_prefix
            .as_deref()
            .is_some_and(|src| ANY_SOURCE.iter().any(|a| a.eq_ignore_ascii_case(src)))
}

impl ResourceKind for NetworkSecurityGroups {
    type Properties = NetworkSecurityGroupProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.Network/networkSecurityGroups";
    const SCOPE: ScopeKind = ScopeKind::Subscription;

    fn recommendations() -> Vec<Recommendation<SecurityGroup>> {
        vec![
            Recommendation {
                id: "nsg-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "NSG should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/virtual-network/virtual-network-nsg-manage-log",
                detailed: false,
            },
            Recommendation {
                id: "nsg-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "NSG Name should comply with naming conventions",
                eval: |g, _| caf_prefix(g, "nsg"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
            Recommendation {
                id: "nsg-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "NSG should have tags",
                eval: |g, _| has_tags(g),
                url: "https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/tag-resources?tabs=json",
                detailed: false,
            },
            Recommendation {
                id: "nsg-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::OperationalExcellence,
                impact: Impact::Low,
                description: "NSG should be associated with a subnet or network interface",
                eval: |g, _| {
                    let attached = !g.properties.subnets.is_empty()
                        || !g.properties.network_interfaces.is_empty();
                    Outcome::broken_if(!attached)
                },
                url: "https://learn.microsoft.com/en-us/azure/virtual-network/network-security-group-how-it-works",
                detailed: false,
            },
            Recommendation {
                id: "nsg-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "NSG should not allow inbound traffic from any source",
                eval: |g, _| {
                    let open: Vec<&str> = g
                        .properties
                        .security_rules
                        .iter()
                        .filter(|r| allows_inbound_from_anywhere(r))
                        .map(|r| r.name.as_str())
                        .collect();
                    Outcome::with_detail(!open.is_empty(), open.join(","))
                },
                url: "https://learn.microsoft.com/en-us/azure/security/fundamentals/network-best-practices",
                detailed: true,
            },
        ]
    }
}
