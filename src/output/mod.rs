pub mod console;
pub mod json;
pub mod markdown;

use serde::{Deserialize, Serialize};

use crate::cloud::{mask_subscription_id, Scope};
use crate::error::Result;
use crate::ScanReport;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Render a report into the specified format. With `mask` set, every
/// subscription id in the output is shortened to its final characters.
pub fn render(report: &ScanReport, format: OutputFormat, mask: bool) -> Result<String> {
    let masked;
    let report = if mask {
        masked = masked_copy(report);
        &masked
    } else {
        report
    };

    match format {
        OutputFormat::Console => Ok(console::render(report)),
        OutputFormat::Json => json::render(report),
        OutputFormat::Markdown => Ok(markdown::render(report)),
    }
}

fn masked_copy(report: &ScanReport) -> ScanReport {
    let mut copy = report.clone();
    for row in &mut copy.rows {
        row.subscription_id = mask_subscription_id(&row.subscription_id);
    }
    for entry in &mut copy.coverage {
        entry.subscription_id = mask_subscription_id(&entry.subscription_id);
        entry.scope = match &entry.scope {
            Scope::Subscription { subscription_id } => Scope::Subscription {
                subscription_id: mask_subscription_id(subscription_id),
            },
            Scope::ResourceGroup {
                subscription_id,
                resource_group,
            } => Scope::ResourceGroup {
                subscription_id: mask_subscription_id(subscription_id),
                resource_group: resource_group.clone(),
            },
        };
    }
    for rec in &mut copy.advisor {
        rec.subscription_id = mask_subscription_id(&rec.subscription_id);
    }
    copy
}
