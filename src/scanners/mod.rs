//! Resource-type scanners.
//!
//! Every resource type is described by a [`ResourceKind`] (type string,
//! listing scope, typed properties, rule table). [`KindScanner`] turns
//! any kind into a [`ResourceScanner`], the single contract the
//! orchestrator drives. Adding a resource type means adding a kind and
//! registering it in [`ScannerRegistry::builtin`].

pub mod advisor;
mod aks;
mod ci;
mod dbw;
mod evh;
mod nsg;
mod sigr;
mod vmss;

use std::collections::HashSet;
use std::marker::PhantomData;

use glob::{MatchOptions, Pattern};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;

use crate::cloud::{
    collect_pages, resource_group_from_id, ArmResource, ScannerConfig, Scope, ScopeKind,
};
use crate::context::ScanContext;
use crate::error::{Result, ReviewError};
use crate::rules::{
    Outcome, Recommendation, RecommendationEngine, RecommendationResult, ResultRow, RowStamp,
    RuleMetadata,
};

/// The contract every resource-type scanner satisfies.
pub trait ResourceScanner: Send + Sync {
    /// Resource types this scanner owns.
    fn resource_types(&self) -> &[&'static str];

    /// Whether listings run per subscription or per resource group.
    fn scope_kind(&self) -> ScopeKind;

    /// Bind credentials and options. Called once before any `scan`.
    fn init(&mut self, config: &ScannerConfig) -> Result<()>;

    /// List live resources in `scope` and evaluate the rule table against
    /// each, returning rows in listing order then rule order.
    fn scan(&self, scope: &Scope, ctx: &ScanContext) -> Result<Vec<ResultRow>>;

    /// Metadata for every rule in this scanner's table.
    fn rules(&self) -> Vec<RuleMetadata>;
}

/// Static description of one resource type.
pub trait ResourceKind: Send + Sync + 'static {
    type Properties: DeserializeOwned + Default + Send + Sync + 'static;

    const RESOURCE_TYPE: &'static str;
    const SCOPE: ScopeKind;

    /// Rule table in report order.
    fn recommendations() -> Vec<Recommendation<ArmResource<Self::Properties>>>;
}

/// Generic scanner for any [`ResourceKind`].
pub struct KindScanner<K: ResourceKind> {
    types: [&'static str; 1],
    rules: Vec<Recommendation<ArmResource<K::Properties>>>,
    config: Option<ScannerConfig>,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> KindScanner<K> {
    pub fn new() -> Self {
        Self {
            types: [K::RESOURCE_TYPE],
            rules: K::recommendations(),
            config: None,
            _kind: PhantomData,
        }
    }

    fn stamp(
        &self,
        scope: &Scope,
        ctx: &ScanContext,
        id: &str,
        name: &str,
        location: &str,
        resource_type: &str,
    ) -> RowStamp {
        RowStamp {
            subscription_id: ctx.subscription.id.clone(),
            subscription_name: ctx.subscription.name.clone(),
            resource_group: scope
                .resource_group()
                .map(str::to_string)
                .unwrap_or_else(|| resource_group_from_id(id)),
            resource_name: name.to_string(),
            resource_type: if resource_type.is_empty() {
                K::RESOURCE_TYPE.to_string()
            } else {
                resource_type.to_string()
            },
            location: location.to_string(),
        }
    }

    /// Rows for a listed resource the typed model could not represent.
    ///
    /// Every applicable rule is reported as indeterminate rather than
    /// dropping the resource.
    fn unreadable_rows(
        &self,
        scope: &Scope,
        ctx: &ScanContext,
        value: &Value,
        rules: &[Recommendation<ArmResource<K::Properties>>],
        err: &serde_json::Error,
    ) -> Vec<ResultRow> {
        let field = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default();
        let header = ArmResource::<IgnoredAny>::deserialize(value).ok();
        let (id, name, location, resource_type) = match &header {
            Some(h) => (
                h.id.as_str(),
                h.name.as_str(),
                h.location.as_str(),
                h.resource_type.as_str(),
            ),
            None => (field("id"), field("name"), field("location"), field("type")),
        };
        tracing::warn!(
            resource_type = K::RESOURCE_TYPE,
            resource = name,
            error = %err,
            "resource has an unexpected shape, reporting its rules as indeterminate"
        );

        let stamp = self.stamp(scope, ctx, id, name, location, resource_type);
        rules
            .iter()
            .map(|rule| {
                let outcome = Outcome::Indeterminate(format!("unexpected resource shape: {err}"));
                ResultRow::stamped(&stamp, RecommendationResult::new(rule, outcome))
            })
            .collect()
    }
}

impl<K: ResourceKind> Default for KindScanner<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ResourceKind> ResourceScanner for KindScanner<K> {
    fn resource_types(&self) -> &[&'static str] {
        &self.types
    }

    fn scope_kind(&self) -> ScopeKind {
        K::SCOPE
    }

    fn init(&mut self, config: &ScannerConfig) -> Result<()> {
        if config.subscription.id.trim().is_empty() {
            return Err(ReviewError::Configuration(format!(
                "{}: subscription id is empty",
                K::RESOURCE_TYPE
            )));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn scan(&self, scope: &Scope, ctx: &ScanContext) -> Result<Vec<ResultRow>> {
        let config = self.config.as_ref().ok_or_else(|| {
            ReviewError::Configuration(format!("{}: scan called before init", K::RESOURCE_TYPE))
        })?;
        if scope.kind() != K::SCOPE {
            return Err(ReviewError::Configuration(format!(
                "{} lists per {:?}, got scope {scope}",
                K::RESOURCE_TYPE,
                K::SCOPE
            )));
        }

        tracing::info!(
            subscription = scope.subscription_id(),
            resource_group = scope.resource_group().unwrap_or("-"),
            resource_type = K::RESOURCE_TYPE,
            "scanning"
        );

        let listed = collect_pages(&config.cancel, |next| {
            config.client.list_resources(scope, K::RESOURCE_TYPE, next)
        })?;

        let applicable: Vec<_> = self
            .rules
            .iter()
            .filter(|r| ctx.detailed || !r.detailed)
            .cloned()
            .collect();
        let engine = RecommendationEngine;
        let mut rows = Vec::with_capacity(listed.len() * applicable.len());

        for value in &listed {
            let resource = match ArmResource::<K::Properties>::deserialize(value) {
                Ok(resource) => resource,
                Err(err) => {
                    rows.extend(self.unreadable_rows(scope, ctx, value, &applicable, &err));
                    continue;
                }
            };

            let stamp = self.stamp(
                scope,
                ctx,
                &resource.id,
                &resource.name,
                &resource.location,
                &resource.resource_type,
            );
            rows.extend(
                engine
                    .evaluate(&applicable, &resource, ctx)
                    .into_iter()
                    .map(|result| ResultRow::stamped(&stamp, result)),
            );
        }

        Ok(rows)
    }

    fn rules(&self) -> Vec<RuleMetadata> {
        self.rules.iter().map(Recommendation::metadata).collect()
    }
}

/// Registration of one resource type.
#[derive(Debug, Clone, Copy)]
pub struct ScannerEntry {
    pub resource_type: &'static str,
    pub scope: ScopeKind,
    factory: fn() -> Box<dyn ResourceScanner>,
}

impl ScannerEntry {
    pub fn of<K: ResourceKind>() -> Self {
        Self {
            resource_type: K::RESOURCE_TYPE,
            scope: K::SCOPE,
            factory: boxed_scanner::<K>,
        }
    }

    /// A fresh, uninitialized scanner.
    pub fn instantiate(&self) -> Box<dyn ResourceScanner> {
        (self.factory)()
    }
}

fn boxed_scanner<K: ResourceKind>() -> Box<dyn ResourceScanner> {
    Box::new(KindScanner::<K>::new())
}

/// All known scanners, validated at construction and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ScannerRegistry {
    entries: Vec<ScannerEntry>,
}

impl ScannerRegistry {
    /// Registry with every built-in resource type.
    pub fn builtin() -> Result<Self> {
        Self::new(vec![
            ScannerEntry::of::<aks::ManagedClusters>(),
            ScannerEntry::of::<ci::ContainerGroups>(),
            ScannerEntry::of::<dbw::DatabricksWorkspaces>(),
            ScannerEntry::of::<evh::EventHubNamespaces>(),
            ScannerEntry::of::<nsg::NetworkSecurityGroups>(),
            ScannerEntry::of::<sigr::SignalRServices>(),
            ScannerEntry::of::<vmss::ScaleSets>(),
        ])
    }

    /// Validate and build a registry.
    ///
    /// Rejects duplicate resource types, rules whose resource type differs
    /// from their owning scanner, duplicate rule ids across all tables, and
    /// documentation links that are not absolute https URLs.
    pub fn new(entries: Vec<ScannerEntry>) -> Result<Self> {
        let mut types = HashSet::new();
        let mut ids = HashSet::new();

        for entry in &entries {
            if !types.insert(entry.resource_type.to_ascii_lowercase()) {
                return Err(ReviewError::Registry(format!(
                    "resource type '{}' registered twice",
                    entry.resource_type
                )));
            }
            for rule in entry.instantiate().rules() {
                if !rule.resource_type.eq_ignore_ascii_case(entry.resource_type) {
                    return Err(ReviewError::Registry(format!(
                        "rule '{}' targets '{}' but is registered under '{}'",
                        rule.id, rule.resource_type, entry.resource_type
                    )));
                }
                if !ids.insert(rule.id.clone()) {
                    return Err(ReviewError::Registry(format!(
                        "duplicate rule id '{}'",
                        rule.id
                    )));
                }
                match url::Url::parse(&rule.url) {
                    Ok(u) if u.scheme() == "https" => {}
                    _ => {
                        return Err(ReviewError::Registry(format!(
                            "rule '{}' has an invalid documentation link '{}'",
                            rule.id, rule.url
                        )))
                    }
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ScannerEntry] {
        &self.entries
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.resource_type).collect()
    }

    /// Metadata for every registered rule, in registration then table order.
    pub fn list_rules(&self) -> Vec<RuleMetadata> {
        self.entries
            .iter()
            .flat_map(|e| e.instantiate().rules())
            .collect()
    }

    /// Entries matching the include patterns (all when empty) and none of
    /// the exclude patterns. Patterns are case-insensitive globs; an exact
    /// type name that matches nothing is a configuration error.
    pub fn select(&self, include: &[String], exclude: &[String]) -> Result<Vec<ScannerEntry>> {
        let include = self.compile(include)?;
        let exclude = self.compile(exclude)?;
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        Ok(self
            .entries
            .iter()
            .filter(|e| {
                include.is_empty()
                    || include
                        .iter()
                        .any(|p| p.matches_with(e.resource_type, options))
            })
            .filter(|e| {
                !exclude
                    .iter()
                    .any(|p| p.matches_with(e.resource_type, options))
            })
            .copied()
            .collect())
    }

    fn compile(&self, patterns: &[String]) -> Result<Vec<Pattern>> {
        patterns
            .iter()
            .map(|raw| {
                let pattern = Pattern::new(raw).map_err(|e| {
                    ReviewError::Configuration(format!("invalid resource type pattern '{raw}': {e}"))
                })?;
                let is_literal = !raw.contains(['*', '?', '[']);
                if is_literal
                    && !self
                        .entries
                        .iter()
                        .any(|e| e.resource_type.eq_ignore_ascii_case(raw))
                {
                    return Err(ReviewError::Configuration(self.unknown_type_message(raw)));
                }
                Ok(pattern)
            })
            .collect()
    }

    fn unknown_type_message(&self, raw: &str) -> String {
        let needle = raw.to_ascii_lowercase();
        let closest = self
            .entries
            .iter()
            .map(|e| {
                let distance =
                    levenshtein::levenshtein(&needle, &e.resource_type.to_ascii_lowercase());
                (distance, e.resource_type)
            })
            .min();

        match closest {
            Some((distance, suggestion)) if distance <= 4 => {
                format!("unknown resource type '{raw}', did you mean '{suggestion}'?")
            }
            _ => format!("unknown resource type '{raw}'"),
        }
    }
}

// ---- helpers shared by the rule tables ----

/// Broken when the resource has no diagnostic setting.
pub(crate) fn diagnostics_enabled<P>(resource: &ArmResource<P>, ctx: &ScanContext) -> Outcome {
    if resource.id.is_empty() {
        return Outcome::missing("resource id");
    }
    let enabled = ctx.diagnostics.has_diagnostics(&resource.id);
    Outcome::with_detail(!enabled, enabled.to_string())
}

/// Broken when the name lacks the conventional abbreviation prefix.
pub(crate) fn caf_prefix<P>(resource: &ArmResource<P>, prefix: &str) -> Outcome {
    let caf = resource.name.to_ascii_lowercase().starts_with(prefix);
    Outcome::with_detail(!caf, caf.to_string())
}

/// Broken when the resource carries no tags.
pub(crate) fn has_tags<P>(resource: &ArmResource<P>) -> Outcome {
    Outcome::broken_if(resource.tags.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::inventory::{Inventory, InventoryClient};
    use crate::cloud::{CancellationToken, Subscription};
    use crate::context::DiagnosticsSettingsIndex;
    use crate::rules::{Category, Impact, RowStatus};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Default, Deserialize)]
    struct GadgetProps {
        #[serde(default)]
        level: Option<u32>,
    }

    struct Gadgets;

    impl ResourceKind for Gadgets {
        type Properties = GadgetProps;
        const RESOURCE_TYPE: &'static str = "Test.Gadgets/gadgets";
        const SCOPE: ScopeKind = ScopeKind::ResourceGroup;

        fn recommendations() -> Vec<Recommendation<ArmResource<GadgetProps>>> {
            vec![
                Recommendation {
                    id: "gad-001",
                    resource_type: Self::RESOURCE_TYPE,
                    category: Category::Monitoring,
                    impact: Impact::Low,
                    description: "Gadget should have diagnostic settings enabled",
                    eval: |r, ctx| diagnostics_enabled(r, ctx),
                    url: "https://example.com/gadgets/diagnostics",
                    detailed: false,
                },
                Recommendation {
                    id: "gad-002",
                    resource_type: Self::RESOURCE_TYPE,
                    category: Category::Performance,
                    impact: Impact::Medium,
                    description: "Gadget level should be at least 2",
                    eval: |r, _| match r.properties.level {
                        Some(level) => Outcome::with_detail(level < 2, level.to_string()),
                        None => Outcome::missing("level"),
                    },
                    url: "https://example.com/gadgets/level",
                    detailed: false,
                },
                Recommendation {
                    id: "gad-003",
                    resource_type: Self::RESOURCE_TYPE,
                    category: Category::Governance,
                    impact: Impact::Low,
                    description: "Gadget deep inspection",
                    eval: |_, _| Outcome::info("inspected"),
                    url: "https://example.com/gadgets/deep",
                    detailed: true,
                },
            ]
        }
    }

    struct Mislabelled;

    impl ResourceKind for Mislabelled {
        type Properties = GadgetProps;
        const RESOURCE_TYPE: &'static str = "Test.Gadgets/other";
        const SCOPE: ScopeKind = ScopeKind::Subscription;

        fn recommendations() -> Vec<Recommendation<ArmResource<GadgetProps>>> {
            let mut rules = Gadgets::recommendations();
            rules.truncate(1);
            rules[0].id = "mis-001";
            rules
        }
    }

    const GADGET_1: &str =
        "/subscriptions/sub-1/resourceGroups/rg-a/providers/Test.Gadgets/gadgets/gadget-1";

    fn config() -> ScannerConfig {
        let inventory: Inventory = serde_json::from_value(json!({
            "pageSize": 1,
            "subscriptions": [{
                "id": "sub-1",
                "name": "Dev",
                "resources": [
                    { "id": GADGET_1, "name": "gadget-1", "type": "Test.Gadgets/gadgets", "location": "westeurope", "properties": { "level": 3 } },
                    { "id": "/subscriptions/sub-1/resourceGroups/rg-a/providers/Test.Gadgets/gadgets/gadget-2", "name": "gadget-2", "type": "Test.Gadgets/gadgets", "location": "westeurope" },
                    { "id": "/subscriptions/sub-1/resourceGroups/rg-a/providers/Test.Gadgets/gadgets/gadget-3", "name": "gadget-3", "type": "Test.Gadgets/gadgets", "properties": { "level": "high" } },
                    { "id": "/subscriptions/sub-1/resourceGroups/rg-b/providers/Test.Gadgets/gadgets/gadget-4", "name": "gadget-4", "type": "Test.Gadgets/gadgets" }
                ]
            }]
        }))
        .unwrap();
        ScannerConfig {
            subscription: Subscription {
                id: "sub-1".into(),
                name: "Dev".into(),
            },
            client: Arc::new(InventoryClient::new(inventory)),
            cancel: CancellationToken::new(),
        }
    }

    fn ctx(detailed: bool) -> ScanContext {
        ScanContext {
            subscription: Subscription {
                id: "sub-1".into(),
                name: "Dev".into(),
            },
            diagnostics: DiagnosticsSettingsIndex::from_resource_ids([GADGET_1.to_uppercase()]),
            detailed,
        }
    }

    fn rg_a() -> Scope {
        Scope::ResourceGroup {
            subscription_id: "sub-1".into(),
            resource_group: "rg-a".into(),
        }
    }

    #[test]
    fn scan_before_init_is_a_configuration_error() {
        let scanner = KindScanner::<Gadgets>::new();
        let err = scanner.scan(&rg_a(), &ctx(false)).unwrap_err();
        assert!(matches!(err, ReviewError::Configuration(_)));
    }

    #[test]
    fn init_rejects_empty_subscription() {
        let mut cfg = config();
        cfg.subscription.id = " ".into();
        let err = KindScanner::<Gadgets>::new().init(&cfg).unwrap_err();
        assert!(matches!(err, ReviewError::Configuration(_)));
    }

    #[test]
    fn rows_follow_listing_then_rule_order() {
        let mut scanner = KindScanner::<Gadgets>::new();
        scanner.init(&config()).unwrap();
        let rows = scanner.scan(&rg_a(), &ctx(false)).unwrap();

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.resource_name.as_str(), r.recommendation_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("gadget-1", "gad-001"),
                ("gadget-1", "gad-002"),
                ("gadget-2", "gad-001"),
                ("gadget-2", "gad-002"),
                ("gadget-3", "gad-001"),
                ("gadget-3", "gad-002"),
            ]
        );
        assert!(rows.iter().all(|r| r.resource_group == "rg-a"));
        assert!(rows.iter().all(|r| r.subscription_name == "Dev"));
    }

    #[test]
    fn diagnostics_and_missing_fields() {
        let mut scanner = KindScanner::<Gadgets>::new();
        scanner.init(&config()).unwrap();
        let rows = scanner.scan(&rg_a(), &ctx(false)).unwrap();

        assert!(!rows[0].broken);
        assert_eq!(rows[0].detail, "true");
        assert_eq!(rows[1].detail, "3");
        assert!(rows[2].broken);
        assert_eq!(rows[3].status, RowStatus::Indeterminate);
        assert!(rows[3].broken);
    }

    #[test]
    fn unreadable_resource_is_reported_not_dropped() {
        let mut scanner = KindScanner::<Gadgets>::new();
        scanner.init(&config()).unwrap();
        let rows = scanner.scan(&rg_a(), &ctx(false)).unwrap();

        let gadget_3: Vec<_> = rows.iter().filter(|r| r.resource_name == "gadget-3").collect();
        assert_eq!(gadget_3.len(), 2);
        assert!(gadget_3
            .iter()
            .all(|r| r.status == RowStatus::Indeterminate && r.detail.contains("unexpected")));
    }

    #[test]
    fn naming_prefix_reports_its_verdict() {
        let named: ArmResource<GadgetProps> =
            serde_json::from_value(json!({ "name": "GAD-east" })).unwrap();
        assert_eq!(caf_prefix(&named, "gad"), Outcome::Passed("true".into()));

        let unnamed: ArmResource<GadgetProps> =
            serde_json::from_value(json!({ "name": "east" })).unwrap();
        assert_eq!(caf_prefix(&unnamed, "gad"), Outcome::Broken("false".into()));
    }

    #[test]
    fn detailed_rules_only_in_detailed_mode() {
        let mut scanner = KindScanner::<Gadgets>::new();
        scanner.init(&config()).unwrap();
        let rows = scanner.scan(&rg_a(), &ctx(true)).unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[2].recommendation_id, "gad-003");
    }

    #[test]
    fn wrong_scope_kind_is_rejected() {
        let mut scanner = KindScanner::<Gadgets>::new();
        scanner.init(&config()).unwrap();
        let scope = Scope::Subscription {
            subscription_id: "sub-1".into(),
        };
        assert!(scanner.scan(&scope, &ctx(false)).is_err());
    }

    #[test]
    fn registry_rejects_mismatched_rule_type() {
        let err = ScannerRegistry::new(vec![ScannerEntry::of::<Mislabelled>()]).unwrap_err();
        assert!(matches!(err, ReviewError::Registry(_)));
    }

    #[test]
    fn registry_rejects_duplicate_types() {
        let err = ScannerRegistry::new(vec![
            ScannerEntry::of::<Gadgets>(),
            ScannerEntry::of::<Gadgets>(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn builtin_rule_ids_are_unique() {
        let registry = ScannerRegistry::builtin().unwrap();
        let rules = registry.list_rules();
        let unique: HashSet<_> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(unique.len(), rules.len());
        assert_eq!(registry.entries().len(), 7);
    }

    #[test]
    fn select_with_globs() {
        let registry = ScannerRegistry::builtin().unwrap();
        let selected = registry
            .select(&["microsoft.container*/*".into()], &[])
            .unwrap();
        let types: Vec<_> = selected.iter().map(|e| e.resource_type).collect();
        assert_eq!(
            types,
            vec![
                "Microsoft.ContainerService/managedClusters",
                "Microsoft.ContainerInstance/containerGroups"
            ]
        );

        let without_nsg = registry
            .select(&[], &["Microsoft.Network/networkSecurityGroups".into()])
            .unwrap();
        assert_eq!(without_nsg.len(), 6);
    }

    #[test]
    fn unknown_type_suggests_closest() {
        let registry = ScannerRegistry::builtin().unwrap();
        let err = registry
            .select(&["Microsoft.EventHub/namespace".into()], &[])
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("did you mean 'Microsoft.EventHub/namespaces'"));
    }
}
