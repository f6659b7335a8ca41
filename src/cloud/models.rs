//! Typed views over resource-manager JSON.
//!
//! Every field a rule might inspect is optional or defaulted: a resource
//! the provider returns with a missing block still deserializes, and the
//! rule decides what absence means.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Envelope shared by every resource-manager resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmResource<P> {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub properties: P,
}

impl<P> ArmResource<P> {
    pub fn sku_name(&self) -> Option<&str> {
        self.sku.as_ref().and_then(|s| s.name.as_deref())
    }

    pub fn sku_tier(&self) -> Option<&str> {
        self.sku.as_ref().and_then(|s| s.tier.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sku {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivateEndpointConnection {
    #[serde(default)]
    pub id: String,
}

// ---- managed clusters ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterProperties {
    #[serde(default)]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
    #[serde(default)]
    pub api_server_access_profile: Option<ApiServerAccessProfile>,
    #[serde(default)]
    pub aad_profile: Option<AadProfile>,
    #[serde(default, rename = "enableRBAC")]
    pub enable_rbac: Option<bool>,
    #[serde(default)]
    pub disable_local_accounts: Option<bool>,
    #[serde(default)]
    pub addon_profiles: BTreeMap<String, AddonProfile>,
    #[serde(default)]
    pub network_profile: Option<NetworkProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub availability_zones: Option<Vec<String>>,
    #[serde(default)]
    pub enable_auto_scaling: Option<bool>,
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerAccessProfile {
    #[serde(default)]
    pub enable_private_cluster: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AadProfile {
    #[serde(default)]
    pub managed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddonProfile {
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default)]
    pub network_plugin: Option<String>,
    #[serde(default)]
    pub outbound_type: Option<String>,
}

// ---- event hub namespaces ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHubNamespaceProperties {
    #[serde(default)]
    pub zone_redundant: Option<bool>,
    #[serde(default)]
    pub private_endpoint_connections: Vec<PrivateEndpointConnection>,
}

// ---- analytics workspaces ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabricksWorkspaceProperties {
    #[serde(default)]
    pub private_endpoint_connections: Vec<PrivateEndpointConnection>,
    #[serde(default)]
    pub parameters: Option<WorkspaceParameters>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParameters {
    #[serde(default, rename = "enableNoPublicIp")]
    pub enable_no_public_ip: Option<BoolParameter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoolParameter {
    #[serde(default)]
    pub value: Option<bool>,
}

// ---- container groups ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupProperties {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub ip_address: Option<IpAddress>,
    #[serde(default)]
    pub subnet_ids: Vec<SubnetReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpAddress {
    #[serde(default, rename = "type")]
    pub address_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubnetReference {
    #[serde(default)]
    pub id: String,
}

// ---- network security groups ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupProperties {
    #[serde(default)]
    pub security_rules: Vec<SecurityRule>,
    #[serde(default)]
    pub subnets: Vec<SubnetReference>,
    #[serde(default)]
    pub network_interfaces: Vec<SubnetReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: SecurityRuleProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleProperties {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub source_address_prefix: Option<String>,
    #[serde(default)]
    pub destination_port_range: Option<String>,
}

// ---- realtime messaging ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRProperties {
    #[serde(default)]
    pub private_endpoint_connections: Vec<PrivateEndpointConnection>,
}

// ---- scale sets ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSetProperties {
    #[serde(default)]
    pub upgrade_policy: Option<UpgradePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradePolicy {
    #[serde(default)]
    pub mode: Option<String>,
}

// ---- subscription-wide listings ----

/// A diagnostic setting attached to some resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSetting {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl DiagnosticSetting {
    /// Lower-cased id of the resource this setting belongs to.
    ///
    /// Setting ids nest under the owning resource:
    /// `<resource id>/providers/microsoft.insights/diagnosticSettings/<name>`.
    pub fn resource_id(&self) -> Option<String> {
        let lower = self.id.to_ascii_lowercase();
        lower
            .find("/providers/microsoft.insights/")
            .filter(|&at| at > 0)
            .map(|at| lower[..at].to_string())
    }
}

/// A provider-generated recommendation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorRecommendation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub properties: AdvisorProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorProperties {
    #[serde(default)]
    pub impacted_value: Option<String>,
    #[serde(default)]
    pub impacted_field: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub short_description: Option<ShortDescription>,
    #[serde(default)]
    pub potential_benefits: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub learn_more_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortDescription {
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
}
