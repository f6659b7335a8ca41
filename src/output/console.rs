use crate::rules::{Impact, ResultRow};
use crate::ScanReport;

/// Render broken rows grouped by subscription, followed by incomplete
/// coverage and the verdict.
pub fn render(report: &ScanReport) -> String {
    let mut output = String::new();
    let broken: Vec<&ResultRow> = report.rows.iter().filter(|r| r.broken).collect();

    if broken.is_empty() {
        output.push_str(&format!(
            "\n  No broken recommendations ({} evaluated).\n\n",
            report.rows.len()
        ));
    } else {
        output.push_str(&format!(
            "\n  {} of {} recommendation(s) broken:\n",
            broken.len(),
            report.rows.len()
        ));

        let mut current = None;
        for row in &broken {
            if current != Some(row.subscription_id.as_str()) {
                current = Some(row.subscription_id.as_str());
                output.push_str(&format!(
                    "\n  Subscription {} ({})\n\n",
                    row.subscription_id, row.subscription_name
                ));
            }
            let impact_tag = match row.impact {
                Impact::High => "[HIGH]  ",
                Impact::Medium => "[MEDIUM]",
                Impact::Low => "[LOW]   ",
            };
            output.push_str(&format!(
                "  {} {} {}\n",
                impact_tag, row.recommendation_id, row.description
            ));
            output.push_str(&format!(
                "           at {}/{} ({})\n",
                row.resource_group, row.resource_name, row.resource_type
            ));
            if !row.detail.is_empty() {
                output.push_str(&format!("           detail: {}\n", row.detail));
            }
        }
        output.push('\n');
    }

    let incomplete: Vec<_> = report
        .coverage
        .iter()
        .filter(|c| !c.status.is_complete())
        .collect();
    if !incomplete.is_empty() {
        output.push_str(&format!(
            "  {} unit(s) not fully scanned:\n",
            incomplete.len()
        ));
        for entry in incomplete {
            output.push_str(&format!(
                "    {} {}: {}\n",
                entry.scope, entry.resource_type, entry.status
            ));
        }
        output.push('\n');
    }

    if !report.advisor.is_empty() {
        output.push_str(&format!(
            "  {} advisor recommendation(s), see the json or markdown report.\n\n",
            report.advisor.len()
        ));
    }

    let status = if report.verdict.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "  Result: {} (threshold: {}, highest: {})\n\n",
        status,
        report.verdict.fail_threshold,
        report
            .verdict
            .highest_impact
            .map(|i| i.to_string())
            .unwrap_or_else(|| "none".into()),
    ));

    output
}
