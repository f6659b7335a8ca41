//! Run driver: builds per-subscription contexts, fans scanners out over a
//! bounded worker pool and aggregates rows into a deterministic order.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cloud::{CancellationToken, CloudClient, ScannerConfig, Scope, ScopeKind, Subscription};
use crate::context::ScanContext;
use crate::error::{Disposition, Result, ReviewError};
use crate::rules::ResultRow;
use crate::scanners::advisor::{AdvisorResult, AdvisorScanner};
use crate::scanners::{ResourceScanner, ScannerRegistry};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Resource type recorded on coverage entries that cover a whole
/// subscription rather than one scanner.
pub const ALL_TYPES: &str = "*";

/// Resource type recorded on advisor coverage entries.
pub const ADVISOR: &str = "Microsoft.Advisor/recommendations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    BuildContext,
    Scanning,
    Aggregating,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::BuildContext => write!(f, "build-context"),
            Self::Scanning => write!(f, "scanning"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// What happened to one (subscription, scope, resource type) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoverageStatus {
    Scanned { resources: usize, rows: usize },
    Skipped { reason: String },
    Failed { error: String },
    Cancelled,
}

impl CoverageStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Scanned { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Scanned { .. } => "scanned",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanned { resources, rows } => {
                write!(f, "scanned ({resources} resources, {rows} rows)")
            }
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Failed { error } => write!(f, "failed: {error}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub subscription_id: String,
    pub scope: Scope,
    pub resource_type: String,
    pub status: CoverageStatus,
}

impl CoverageEntry {
    fn new(scope: &Scope, resource_type: &str, status: CoverageStatus) -> Self {
        Self {
            subscription_id: scope.subscription_id().to_string(),
            scope: scope.clone(),
            resource_type: resource_type.to_string(),
            status,
        }
    }

    pub fn sort_key(&self) -> (String, String, String) {
        (
            self.subscription_id.to_ascii_lowercase(),
            self.scope
                .resource_group()
                .unwrap_or_default()
                .to_ascii_lowercase(),
            self.resource_type.to_ascii_lowercase(),
        )
    }
}

/// Knobs for one run. The cloud client is passed separately.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Subscription ids to scan; empty means every visible subscription.
    pub subscriptions: Vec<String>,
    /// Resource groups to scan (case-insensitive); empty means all.
    pub resource_groups: Vec<String>,
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub concurrency: usize,
    pub detailed: bool,
    pub advisor: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            resource_groups: Vec::new(),
            include_types: Vec::new(),
            exclude_types: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            detailed: false,
            advisor: false,
        }
    }
}

/// Everything a finished run produced, already ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResults {
    pub rows: Vec<ResultRow>,
    pub coverage: Vec<CoverageEntry>,
    pub advisor: Vec<AdvisorResult>,
}

struct Plan {
    subscription: Subscription,
    resource_groups: Vec<String>,
    /// Dropped once the subscription's last task finishes.
    context: Mutex<Option<Arc<ScanContext>>>,
    pending: AtomicUsize,
}

impl Plan {
    fn new(context: ScanContext, resource_groups: Vec<String>) -> Self {
        Self {
            subscription: context.subscription.clone(),
            resource_groups,
            context: Mutex::new(Some(Arc::new(context))),
            pending: AtomicUsize::new(0),
        }
    }

    fn context(&self) -> Result<Arc<ScanContext>> {
        self.context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                ReviewError::Internal(format!(
                    "scan context for {} already released",
                    self.subscription.id
                ))
            })
    }

    /// Record one finished task; the last one releases the context.
    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.release();
        }
    }

    fn release(&self) {
        let released = self
            .context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if released.is_some() {
            tracing::debug!(subscription = %self.subscription.id, "scan context released");
        }
    }
}

struct Bound {
    plan: usize,
    resource_type: &'static str,
    scanner: Box<dyn ResourceScanner>,
}

enum Task {
    Resources { bound: usize, scope: Scope },
    Advisor { plan: usize },
}

impl Task {
    fn plan(&self, bound: &[Bound]) -> usize {
        match self {
            Self::Resources { bound: index, .. } => bound[*index].plan,
            Self::Advisor { plan } => *plan,
        }
    }
}

#[derive(Default)]
struct TaskOutput {
    rows: Vec<ResultRow>,
    advisor: Vec<AdvisorResult>,
    coverage: Option<CoverageEntry>,
}

pub struct Orchestrator {
    client: Arc<dyn CloudClient>,
    registry: ScannerRegistry,
    options: OrchestratorOptions,
    cancel: CancellationToken,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn CloudClient>,
        registry: ScannerRegistry,
        options: OrchestratorOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            registry,
            options,
            cancel,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
    }

    /// Execute the whole run.
    pub fn run(&mut self) -> Result<ScanResults> {
        let outcome = self.run_phases();
        if outcome.is_err() {
            self.enter(Phase::Aborted);
        }
        outcome
    }

    fn run_phases(&mut self) -> Result<ScanResults> {
        let selected = self
            .registry
            .select(&self.options.include_types, &self.options.exclude_types)?;
        if selected.is_empty() && !self.options.advisor {
            tracing::warn!("no resource types selected, nothing will be scanned");
        }

        self.enter(Phase::BuildContext);
        let subscriptions = self.resolve_subscriptions()?;
        let mut coverage = Vec::new();
        let mut plans = Vec::new();
        let mut first_failure = None;

        for subscription in &subscriptions {
            match self.build_plan(subscription) {
                Ok(plan) => plans.push(plan),
                Err(err) if err.disposition() == Disposition::Fatal => {
                    return Err(ReviewError::Cancelled)
                }
                Err(err) => {
                    tracing::error!(subscription = %subscription.id, error = %err, "cannot build scan context");
                    coverage.push(CoverageEntry::new(
                        &Scope::Subscription {
                            subscription_id: subscription.id.clone(),
                        },
                        ALL_TYPES,
                        CoverageStatus::Failed {
                            error: err.to_string(),
                        },
                    ));
                    first_failure.get_or_insert(err);
                }
            }
        }

        if plans.is_empty() {
            return Err(first_failure.unwrap_or_else(|| {
                ReviewError::Configuration("no subscriptions to scan".into())
            }));
        }

        self.enter(Phase::Scanning);
        let mut bound = Vec::new();
        for (index, plan) in plans.iter().enumerate() {
            let config = ScannerConfig {
                subscription: plan.subscription.clone(),
                client: Arc::clone(&self.client),
                cancel: self.cancel.clone(),
            };
            for entry in &selected {
                let mut scanner = entry.instantiate();
                match scanner.init(&config) {
                    Ok(()) => bound.push(Bound {
                        plan: index,
                        resource_type: entry.resource_type,
                        scanner,
                    }),
                    Err(err) => {
                        tracing::error!(
                            subscription = %config.subscription.id,
                            resource_type = entry.resource_type,
                            error = %err,
                            "scanner init failed"
                        );
                        coverage.push(CoverageEntry::new(
                            &Scope::Subscription {
                                subscription_id: config.subscription.id.clone(),
                            },
                            entry.resource_type,
                            CoverageStatus::Failed {
                                error: err.to_string(),
                            },
                        ));
                    }
                }
            }
        }

        let tasks = self.tasks(&plans, &bound);
        for task in &tasks {
            plans[task.plan(&bound)].pending.fetch_add(1, Ordering::Relaxed);
        }
        for plan in plans.iter().filter(|p| p.pending.load(Ordering::Relaxed) == 0) {
            plan.release();
        }
        tracing::info!(
            subscriptions = plans.len(),
            scanners = bound.len(),
            tasks = tasks.len(),
            concurrency = self.options.concurrency.max(1),
            "scanning"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.concurrency.max(1))
            .build()
            .map_err(|e| ReviewError::Internal(format!("cannot start worker pool: {e}")))?;

        let collected: Mutex<Vec<(usize, TaskOutput)>> = Mutex::new(Vec::with_capacity(tasks.len()));
        pool.install(|| {
            tasks.par_iter().enumerate().for_each(|(index, task)| {
                let output = self.execute(task, &plans, &bound);
                plans[task.plan(&bound)].finish();
                collected
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push((index, output));
            });
        });

        if self.cancel.is_cancelled() {
            tracing::warn!("run cancelled");
            return Err(ReviewError::Cancelled);
        }

        self.enter(Phase::Aggregating);
        let mut outputs = collected.into_inner().unwrap_or_else(|e| e.into_inner());
        outputs.sort_by_key(|(index, _)| *index);

        let mut results = ScanResults {
            coverage,
            ..ScanResults::default()
        };
        for (_, output) in outputs {
            results.rows.extend(output.rows);
            results.advisor.extend(output.advisor);
            results.coverage.extend(output.coverage);
        }
        results.rows.sort_by_cached_key(ResultRow::sort_key);
        results.coverage.sort_by_cached_key(CoverageEntry::sort_key);
        results.advisor.sort_by_key(AdvisorResult::sort_key);

        let incomplete = results
            .coverage
            .iter()
            .filter(|c| !c.status.is_complete())
            .count();
        tracing::info!(
            rows = results.rows.len(),
            broken = results.rows.iter().filter(|r| r.broken).count(),
            advisor = results.advisor.len(),
            incomplete,
            "scan complete"
        );

        self.enter(Phase::Done);
        Ok(results)
    }

    fn resolve_subscriptions(&self) -> Result<Vec<Subscription>> {
        let visible = self.client.list_subscriptions()?;
        if self.options.subscriptions.is_empty() {
            return Ok(visible);
        }
        Ok(self
            .options
            .subscriptions
            .iter()
            .map(|id| {
                visible
                    .iter()
                    .find(|s| s.id.eq_ignore_ascii_case(id))
                    .cloned()
                    .unwrap_or_else(|| Subscription {
                        id: id.clone(),
                        name: String::new(),
                    })
            })
            .collect())
    }

    fn build_plan(&self, subscription: &Subscription) -> Result<Plan> {
        let wrap = |source: ReviewError| match source {
            ReviewError::Cancelled => ReviewError::Cancelled,
            source => ReviewError::ContextBuild {
                subscription_id: subscription.id.clone(),
                source: Box::new(source),
            },
        };

        self.cancel.check()?;
        let groups = self
            .client
            .list_resource_groups(&subscription.id)
            .map_err(wrap)?;
        let resource_groups = self.filter_groups(&subscription.id, groups);
        let context = ScanContext::build(
            self.client.as_ref(),
            subscription,
            self.options.detailed,
            &self.cancel,
        )
        .map_err(wrap)?;

        tracing::info!(
            subscription = %subscription.id,
            resource_groups = resource_groups.len(),
            diagnostics = context.diagnostics.len(),
            "scan context ready"
        );
        Ok(Plan::new(context, resource_groups))
    }

    fn filter_groups(&self, subscription_id: &str, groups: Vec<String>) -> Vec<String> {
        let wanted = &self.options.resource_groups;
        if wanted.is_empty() {
            return groups;
        }
        for name in wanted {
            if !groups.iter().any(|g| g.eq_ignore_ascii_case(name)) {
                tracing::warn!(
                    subscription = subscription_id,
                    resource_group = %name,
                    "configured resource group not found"
                );
            }
        }
        groups
            .into_iter()
            .filter(|g| wanted.iter().any(|w| w.eq_ignore_ascii_case(g)))
            .collect()
    }

    fn tasks(&self, plans: &[Plan], bound: &[Bound]) -> Vec<Task> {
        let mut tasks = Vec::new();
        for (index, b) in bound.iter().enumerate() {
            let plan = &plans[b.plan];
            let subscription_id = plan.subscription.id.clone();
            match b.scanner.scope_kind() {
                ScopeKind::Subscription => tasks.push(Task::Resources {
                    bound: index,
                    scope: Scope::Subscription { subscription_id },
                }),
                ScopeKind::ResourceGroup => {
                    tasks.extend(plan.resource_groups.iter().map(|group| Task::Resources {
                        bound: index,
                        scope: Scope::ResourceGroup {
                            subscription_id: subscription_id.clone(),
                            resource_group: group.clone(),
                        },
                    }))
                }
            }
        }
        if self.options.advisor {
            tasks.extend((0..plans.len()).map(|plan| Task::Advisor { plan }));
        }
        tasks
    }

    fn execute(&self, task: &Task, plans: &[Plan], bound: &[Bound]) -> TaskOutput {
        match task {
            Task::Resources { bound: index, scope } => {
                let b = &bound[*index];
                let result = self
                    .cancel
                    .check()
                    .and_then(|()| plans[b.plan].context())
                    .and_then(|ctx| b.scanner.scan(scope, &ctx))
                    .map(|rows| self.within_groups(rows));
                match result {
                    Ok(rows) => {
                        let resources = rows
                            .iter()
                            .map(|r| {
                                (
                                    r.resource_group.to_ascii_lowercase(),
                                    r.resource_name.to_ascii_lowercase(),
                                )
                            })
                            .collect::<HashSet<_>>()
                            .len();
                        let status = CoverageStatus::Scanned {
                            resources,
                            rows: rows.len(),
                        };
                        TaskOutput {
                            rows,
                            advisor: Vec::new(),
                            coverage: Some(CoverageEntry::new(scope, b.resource_type, status)),
                        }
                    }
                    Err(err) => TaskOutput {
                        coverage: Some(self.failed(scope, b.resource_type, &err)),
                        ..TaskOutput::default()
                    },
                }
            }
            Task::Advisor { plan } => {
                let subscription = &plans[*plan].subscription;
                let scope = Scope::Subscription {
                    subscription_id: subscription.id.clone(),
                };
                let mut scanner = AdvisorScanner::new();
                let config = ScannerConfig {
                    subscription: subscription.clone(),
                    client: Arc::clone(&self.client),
                    cancel: self.cancel.clone(),
                };
                let result = self
                    .cancel
                    .check()
                    .and_then(|()| scanner.init(&config))
                    .and_then(|()| scanner.scan());
                match result {
                    Ok(advisor) => {
                        let status = CoverageStatus::Scanned {
                            resources: advisor.len(),
                            rows: advisor.len(),
                        };
                        TaskOutput {
                            rows: Vec::new(),
                            advisor,
                            coverage: Some(CoverageEntry::new(&scope, ADVISOR, status)),
                        }
                    }
                    Err(err) => TaskOutput {
                        coverage: Some(self.failed(&scope, ADVISOR, &err)),
                        ..TaskOutput::default()
                    },
                }
            }
        }
    }

    /// Rows from subscription-wide listings honour the resource-group filter.
    fn within_groups(&self, mut rows: Vec<ResultRow>) -> Vec<ResultRow> {
        let wanted = &self.options.resource_groups;
        if !wanted.is_empty() {
            rows.retain(|r| wanted.iter().any(|w| w.eq_ignore_ascii_case(&r.resource_group)));
        }
        rows
    }

    fn failed(&self, scope: &Scope, resource_type: &str, err: &ReviewError) -> CoverageEntry {
        let status = match err.disposition() {
            Disposition::Skip => {
                tracing::warn!(
                    subscription = scope.subscription_id(),
                    resource_group = scope.resource_group().unwrap_or("-"),
                    resource_type,
                    error = %err,
                    "skipping"
                );
                CoverageStatus::Skipped {
                    reason: err.to_string(),
                }
            }
            Disposition::Fault => {
                tracing::error!(
                    subscription = scope.subscription_id(),
                    resource_group = scope.resource_group().unwrap_or("-"),
                    resource_type,
                    error = %err,
                    "scan failed"
                );
                CoverageStatus::Failed {
                    error: err.to_string(),
                }
            }
            Disposition::Fatal => CoverageStatus::Cancelled,
        };
        tracing::debug!(resource_type, state = status.label(), "unit finished");
        CoverageEntry::new(scope, resource_type, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::inventory::{Inventory, InventoryClient};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const EVH: &str = "Microsoft.EventHub/namespaces";
    const SIGR: &str = "Microsoft.SignalRService/SignalR";

    fn resource(sub: &str, group: &str, provider_type: &str, name: &str) -> Value {
        json!({
            "id": format!("/subscriptions/{sub}/resourceGroups/{group}/providers/{provider_type}/{name}"),
            "name": name,
            "type": provider_type,
            "location": "westeurope",
            "sku": { "name": "Standard", "tier": "Standard" }
        })
    }

    fn inventory() -> Value {
        json!({
            "pageSize": 2,
            "subscriptions": [
                {
                    "id": "sub-b",
                    "name": "Beta",
                    "resources": [ resource("sub-b", "rg-z", EVH, "evh-z") ]
                },
                {
                    "id": "sub-a",
                    "name": "Alpha",
                    "resources": [
                        resource("sub-a", "rg-b", EVH, "evh-2"),
                        resource("sub-a", "rg-a", EVH, "evh-1"),
                        resource("sub-a", "rg-a", SIGR, "sigr-1")
                    ],
                    "diagnosticSettings": [
                        { "id": "/subscriptions/sub-a/resourceGroups/rg-a/providers/Microsoft.EventHub/namespaces/evh-1/providers/microsoft.insights/diagnosticSettings/to-law" }
                    ],
                    "advisor": [
                        { "id": "rec-1", "properties": { "impactedValue": "evh-1", "impactedField": EVH, "category": "Cost" } }
                    ],
                    "faults": [
                        { "operation": "listResources", "resourceType": SIGR, "resourceGroup": "rg-a", "status": 403, "code": "AuthorizationFailed", "message": "denied" }
                    ]
                }
            ]
        })
    }

    fn orchestrator(inventory: Value, options: OrchestratorOptions) -> Orchestrator {
        let inventory: Inventory = serde_json::from_value(inventory).unwrap();
        Orchestrator::new(
            Arc::new(InventoryClient::new(inventory)),
            ScannerRegistry::builtin().unwrap(),
            options,
            CancellationToken::new(),
        )
    }

    fn options() -> OrchestratorOptions {
        OrchestratorOptions {
            include_types: vec![EVH.into(), SIGR.into()],
            ..OrchestratorOptions::default()
        }
    }

    fn status_of<'a>(
        coverage: &'a [CoverageEntry],
        sub: &str,
        group: &str,
        resource_type: &str,
    ) -> &'a CoverageStatus {
        &coverage
            .iter()
            .find(|c| {
                c.subscription_id == sub
                    && c.scope.resource_group() == Some(group)
                    && c.resource_type == resource_type
            })
            .unwrap()
            .status
    }

    #[test]
    fn permission_gap_is_skipped_and_siblings_complete() {
        let mut run = orchestrator(inventory(), options());
        let results = run.run().unwrap();

        assert_eq!(run.phase(), Phase::Done);
        assert_eq!(results.rows.len(), 18);
        assert!(results.rows.iter().all(|r| r.resource_type == EVH));
        assert!(matches!(
            status_of(&results.coverage, "sub-a", "rg-a", SIGR),
            CoverageStatus::Skipped { .. }
        ));
        assert_eq!(
            status_of(&results.coverage, "sub-a", "rg-a", EVH),
            &CoverageStatus::Scanned {
                resources: 1,
                rows: 6
            }
        );
        assert_eq!(
            status_of(&results.coverage, "sub-a", "rg-b", SIGR),
            &CoverageStatus::Scanned {
                resources: 0,
                rows: 0
            }
        );
        assert_eq!(results.coverage.len(), 6);
    }

    #[test]
    fn rows_are_ordered_by_location() {
        let results = orchestrator(inventory(), options()).run().unwrap();
        let names: Vec<_> = results
            .rows
            .iter()
            .map(|r| r.resource_name.as_str())
            .collect::<Vec<_>>()
            .chunks(6)
            .map(|c| c[0])
            .collect();
        assert_eq!(names, vec!["evh-1", "evh-2", "evh-z"]);

        let ids: Vec<_> = results.rows[..6]
            .iter()
            .map(|r| r.recommendation_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["evh-001", "evh-002", "evh-003", "evh-004", "evh-005", "evh-006"]
        );
        assert!(!results.rows[0].broken);
        assert!(results.rows[6].broken);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let first = orchestrator(inventory(), options()).run().unwrap();
        let serial = orchestrator(
            inventory(),
            OrchestratorOptions {
                concurrency: 1,
                ..options()
            },
        )
        .run()
        .unwrap();
        let second = orchestrator(inventory(), options()).run().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, serial);
    }

    #[test]
    fn transient_fault_is_recorded_as_failed() {
        let mut inv = inventory();
        inv["subscriptions"][0]["faults"] = json!([
            { "operation": "listResources", "resourceType": EVH, "status": 503, "code": "ServiceUnavailable", "message": "busy" }
        ]);
        let results = orchestrator(inv, options()).run().unwrap();

        assert!(matches!(
            status_of(&results.coverage, "sub-b", "rg-z", EVH),
            CoverageStatus::Failed { .. }
        ));
        assert!(results.rows.iter().all(|r| r.subscription_id == "sub-a"));
    }

    #[test]
    fn context_failure_drops_only_that_subscription() {
        let mut inv = inventory();
        inv["subscriptions"][0]["faults"] = json!([
            { "operation": "listDiagnosticSettings", "status": 500, "code": "InternalServerError", "message": "boom" }
        ]);
        let results = orchestrator(inv, options()).run().unwrap();

        assert_eq!(results.rows.len(), 12);
        let failed: Vec<_> = results
            .coverage
            .iter()
            .filter(|c| c.resource_type == ALL_TYPES)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].subscription_id, "sub-b");
    }

    #[test]
    fn run_aborts_when_no_context_builds() {
        let mut run = orchestrator(
            inventory(),
            OrchestratorOptions {
                subscriptions: vec!["sub-missing".into()],
                ..options()
            },
        );
        let err = run.run().unwrap_err();
        assert!(matches!(err, ReviewError::ContextBuild { .. }));
        assert_eq!(run.phase(), Phase::Aborted);
    }

    #[test]
    fn cancelled_run_returns_cancelled() {
        let mut run = orchestrator(inventory(), options());
        run.cancellation().cancel();
        let err = run.run().unwrap_err();
        assert!(matches!(err, ReviewError::Cancelled));
        assert_eq!(err.exit_code(), 130);
        assert_eq!(run.phase(), Phase::Aborted);
    }

    #[test]
    fn resource_group_filter_limits_scopes() {
        let results = orchestrator(
            inventory(),
            OrchestratorOptions {
                subscriptions: vec!["SUB-A".into()],
                resource_groups: vec!["RG-B".into()],
                ..options()
            },
        )
        .run()
        .unwrap();

        assert_eq!(results.rows.len(), 6);
        assert!(results.rows.iter().all(|r| r.resource_name == "evh-2"));
        assert_eq!(results.rows[0].subscription_name, "Alpha");
    }

    #[test]
    fn advisor_rows_are_collected_when_enabled() {
        let results = orchestrator(
            inventory(),
            OrchestratorOptions {
                advisor: true,
                include_types: vec![EVH.into()],
                ..OrchestratorOptions::default()
            },
        )
        .run()
        .unwrap();

        assert_eq!(results.advisor.len(), 1);
        assert_eq!(results.advisor[0].name, "evh-1");
        assert_eq!(
            results
                .coverage
                .iter()
                .filter(|c| c.resource_type == ADVISOR)
                .count(),
            2
        );
    }

    #[test]
    fn unknown_type_filter_is_rejected_before_scanning() {
        let mut run = orchestrator(
            inventory(),
            OrchestratorOptions {
                include_types: vec!["Microsoft.Nope/things".into()],
                ..OrchestratorOptions::default()
            },
        );
        assert!(matches!(run.run(), Err(ReviewError::Configuration(_))));
    }

    #[test]
    fn context_is_released_after_last_task() {
        let context = ScanContext::new(
            Subscription {
                id: "sub-a".into(),
                name: "Alpha".into(),
            },
            Default::default(),
        );
        let plan = Plan::new(context, vec!["rg-a".into()]);
        plan.pending.store(2, Ordering::Relaxed);

        plan.finish();
        assert!(plan.context().is_ok());
        plan.finish();
        assert!(matches!(plan.context(), Err(ReviewError::Internal(_))));
    }
}
