use crate::error::Result;
use crate::ScanReport;

/// Render the full report, rows and coverage included, as JSON.
pub fn render(report: &ScanReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::policy::Policy;

    #[test]
    fn empty_report_has_all_sections() {
        let report = ScanReport::new(Vec::new(), Vec::new(), Vec::new(), &Policy::default());
        let value: serde_json::Value = serde_json::from_str(&render(&report).unwrap()).unwrap();
        for key in ["run_id", "generated_at", "rows", "coverage", "advisor", "verdict"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["verdict"]["pass"], true);
    }
}
