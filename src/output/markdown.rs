use crate::ScanReport;

fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = format!("| {} |\n", header.join(" | "));
    out.push_str(&format!("|{}\n", "---|".repeat(header.len())));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| cell(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

/// Render the report as a Markdown document.
pub fn render(report: &ScanReport) -> String {
    let mut out = String::from("# Azure Review\n\n");
    out.push_str(&format!(
        "Run `{}` generated {}.\n\n",
        report.run_id,
        report.generated_at.to_rfc3339()
    ));

    out.push_str("## Services\n\n");
    let (header, rows) = report.services_table();
    if rows.is_empty() {
        out.push_str("No resources evaluated.\n\n");
    } else {
        out.push_str(&table(&header, &rows));
        out.push('\n');
    }

    out.push_str("## Coverage\n\n");
    let coverage: Vec<Vec<String>> = report
        .coverage
        .iter()
        .map(|c| {
            vec![
                c.subscription_id.clone(),
                c.scope.resource_group().unwrap_or("*").to_string(),
                c.resource_type.clone(),
                c.status.to_string(),
            ]
        })
        .collect();
    out.push_str(&table(
        &["Subscription", "Resource Group", "Type", "Status"],
        &coverage,
    ));
    out.push('\n');

    if !report.advisor.is_empty() {
        out.push_str("## Advisor\n\n");
        let advisor: Vec<Vec<String>> = report
            .advisor
            .iter()
            .map(|a| {
                vec![
                    a.subscription_id.clone(),
                    a.name.clone(),
                    a.resource_type.clone(),
                    a.category.clone(),
                    a.description.clone(),
                    a.risk.clone(),
                    a.learn_more_link.clone(),
                ]
            })
            .collect();
        out.push_str(&table(
            &[
                "Subscription",
                "Name",
                "Type",
                "Category",
                "Description",
                "Risk",
                "Learn",
            ],
            &advisor,
        ));
        out.push('\n');
    }

    let v = &report.verdict;
    out.push_str(&format!(
        "**Result: {}**, {} of {} rows broken (threshold: {}).\n",
        if v.pass { "PASS" } else { "FAIL" },
        v.broken_rows,
        v.total_rows,
        v.fail_threshold
    ));
    out
}
