use super::{caf_prefix, diagnostics_enabled, ResourceKind};
use crate::cloud::models::DatabricksWorkspaceProperties;
use crate::cloud::{ArmResource, ScopeKind};
use crate::rules::{Category, Impact, Outcome, Recommendation};

type Workspace = ArmResource<DatabricksWorkspaceProperties>;

/// Databricks analytics workspaces.
pub struct DatabricksWorkspaces;

impl ResourceKind for DatabricksWorkspaces {
    type Properties = DatabricksWorkspaceProperties;

    const RESOURCE_TYPE: &'static str = "Microsoft.Databricks/workspaces";
    const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

    fn recommendations() -> Vec<Recommendation<Workspace>> {
        vec![
            Recommendation {
                id: "dbw-001",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Monitoring,
                impact: Impact::Low,
                description: "Azure Databricks should have diagnostic settings enabled",
                eval: diagnostics_enabled,
                url: "https://learn.microsoft.com/en-us/azure/databricks/administration-guide/account-settings/audit-log-delivery",
                detailed: false,
            },
            Recommendation {
                id: "dbw-003",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Azure Databricks should have a SLA",
                eval: |_, _| Outcome::info("99.95%"),
                url: "https://www.microsoft.com/licensing/docs/view/Service-Level-Agreements-SLA-for-Online-Services",
                detailed: false,
            },
            Recommendation {
                id: "dbw-004",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::High,
                description: "Azure Databricks should have private endpoints enabled",
                eval: |w, _| {
                    Outcome::broken_if(w.properties.private_endpoint_connections.is_empty())
                },
                url: "https://learn.microsoft.com/en-us/azure/databricks/administration-guide/cloud-configurations/azure/private-link",
                detailed: false,
            },
            Recommendation {
                id: "dbw-005",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::HighAvailability,
                impact: Impact::High,
                description: "Azure Databricks SKU",
                eval: |w, _| match w.sku_name() {
                    Some(sku) => Outcome::info(sku),
                    None => Outcome::missing("sku.name"),
                },
                url: "https://azure.microsoft.com/en-us/pricing/details/databricks/",
                detailed: false,
            },
            Recommendation {
                id: "dbw-006",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Governance,
                impact: Impact::Low,
                description: "Azure Databricks Name should comply with naming conventions",
                eval: |w, _| caf_prefix(w, "dbw"),
                url: "https://learn.microsoft.com/en-us/azure/cloud-adoption-framework/ready/azure-best-practices/resource-abbreviations",
                detailed: false,
            },
            Recommendation {
                id: "dbw-007",
                resource_type: Self::RESOURCE_TYPE,
                category: Category::Security,
                impact: Impact::Medium,
                description: "Azure Databricks should have the Public IP disabled",
                eval: |w, _| {
                    let no_public_ip = w
                        .properties
                        .parameters
                        .as_ref()
                        .and_then(|p| p.enable_no_public_ip.as_ref())
                        .and_then(|p| p.value)
                        .unwrap_or(false);
                    Outcome::broken_if(!no_public_ip)
                },
                url: "https://learn.microsoft.com/en-us/azure/databricks/security/network/secure-cluster-connectivity",
                detailed: false,
            },
        ]
    }
}
