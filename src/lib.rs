//! cloudreview: best-practice review for cloud resource inventories.
//!
//! Lists every resource of each supported type across the configured
//! subscriptions, evaluates a fixed table of recommendations against each
//! one and reports the outcome, together with which parts of the account
//! could not be scanned.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use cloudreview::{scan_inventory, ScanOptions};
//!
//! let options = ScanOptions::default();
//! let report = scan_inventory(Path::new("inventory.json"), &options).unwrap();
//! println!("Pass: {}, Rows: {}", report.verdict.pass, report.rows.len());
//! ```

pub mod cloud;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod rules;
pub mod scanners;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use cloud::inventory::{Inventory, InventoryClient};
use cloud::{CancellationToken, CloudClient};
use config::{Config, ScanOverrides};
use error::Result;
use orchestrator::{CoverageEntry, Orchestrator};
use output::OutputFormat;
use rules::policy::{Policy, PolicyVerdict};
use rules::{Impact, ResultRow};
use scanners::advisor::AdvisorResult;
use scanners::ScannerRegistry;

/// Options for a scan invocation.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.cloudreview.toml` in the working
    /// directory).
    pub config_path: Option<PathBuf>,
    /// CLI override for fail_on threshold.
    pub fail_on_override: Option<Impact>,
    /// CLI overrides for the `[scan]` section.
    pub overrides: ScanOverrides,
    /// Shared cancellation flag; the configured timeout is layered on top.
    pub cancel: CancellationToken,
}

/// Complete scan report.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Effective rows: ignored rules removed, impact overrides applied.
    pub rows: Vec<ResultRow>,
    pub coverage: Vec<CoverageEntry>,
    pub advisor: Vec<AdvisorResult>,
    pub verdict: PolicyVerdict,
    /// Render subscription ids masked.
    #[serde(skip)]
    pub mask: bool,
}

impl ScanReport {
    pub fn new(
        rows: Vec<ResultRow>,
        coverage: Vec<CoverageEntry>,
        advisor: Vec<AdvisorResult>,
        policy: &Policy,
    ) -> Self {
        let verdict = policy.evaluate(&rows);
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            rows: policy.apply(&rows),
            coverage,
            advisor,
            verdict,
            mask: false,
        }
    }

    /// Header and string cells for tabular renderers, one line per row.
    pub fn services_table(&self) -> (Vec<&'static str>, Vec<Vec<String>>) {
        let header = vec![
            "Subscription",
            "Resource Group",
            "Location",
            "Type",
            "Name",
            "Category",
            "Impact",
            "Recommendation",
            "Broken",
            "Detail",
            "Learn",
        ];
        let rows = self
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.subscription_id.clone(),
                    r.resource_group.clone(),
                    r.location.clone(),
                    r.resource_type.clone(),
                    r.resource_name.clone(),
                    r.category.to_string(),
                    r.impact.to_string(),
                    r.description.clone(),
                    r.broken.to_string(),
                    r.detail.clone(),
                    r.url.clone(),
                ]
            })
            .collect();
        (header, rows)
    }
}

/// Run a complete scan through `client`: load config, fan out the
/// selected scanners, apply policy.
pub fn scan(client: Arc<dyn CloudClient>, options: &ScanOptions) -> Result<ScanReport> {
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(".cloudreview.toml"));
    let mut config = Config::load(&config_path)?;

    if let Some(fail_on) = options.fail_on_override {
        config.policy.fail_on = fail_on;
    }
    options.overrides.apply(&mut config.scan);
    config.scan.validate()?;

    let cancel = match config.scan.timeout_secs {
        Some(secs) => options.cancel.expiring_after(Duration::from_secs(secs)),
        None => options.cancel.clone(),
    };

    let registry = ScannerRegistry::builtin()?;
    let mut orchestrator = Orchestrator::new(
        client,
        registry,
        config.scan.orchestrator_options(),
        cancel,
    );
    let results = orchestrator.run()?;

    let mut report = ScanReport::new(
        results.rows,
        results.coverage,
        results.advisor,
        &config.policy,
    );
    report.mask = config.scan.mask;
    Ok(report)
}

/// [`scan`] against an offline inventory export.
pub fn scan_inventory(path: &Path, options: &ScanOptions) -> Result<ScanReport> {
    let inventory = Inventory::load(path)?;
    tracing::info!(
        path = %path.display(),
        subscriptions = inventory.subscriptions.len(),
        "inventory loaded"
    );
    scan(Arc::new(InventoryClient::new(inventory)), options)
}

/// Render a scan report in the specified format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    output::render(report, format, report.mask)
}
