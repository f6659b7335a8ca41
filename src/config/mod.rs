use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError};
use crate::orchestrator::{OrchestratorOptions, DEFAULT_CONCURRENCY};
use crate::rules::policy::Policy;

/// Top-level configuration from `.cloudreview.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub policy: Policy,
}

/// The `[scan]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Subscription ids; empty scans every subscription the client sees.
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default)]
    pub resource_groups: Vec<String>,
    /// Resource type globs to scan; empty means all registered types.
    #[serde(default)]
    pub include_types: Vec<String>,
    #[serde(default)]
    pub exclude_types: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub detailed: bool,
    #[serde(default)]
    pub advisor: bool,
    /// Whole-run deadline in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub mask: bool,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            resource_groups: Vec::new(),
            include_types: Vec::new(),
            exclude_types: Vec::new(),
            concurrency: default_concurrency(),
            detailed: false,
            advisor: false,
            timeout_secs: None,
            mask: false,
        }
    }
}

impl ScanSettings {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ReviewError::Configuration(
                "scan.concurrency must be at least 1".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ReviewError::Configuration(
                "scan.timeout_secs must be positive".into(),
            ));
        }
        if let Some(blank) = self.subscriptions.iter().find(|s| s.trim().is_empty()) {
            return Err(ReviewError::Configuration(format!(
                "scan.subscriptions contains an empty id ({blank:?})"
            )));
        }
        Ok(())
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            subscriptions: self.subscriptions.clone(),
            resource_groups: self.resource_groups.clone(),
            include_types: self.include_types.clone(),
            exclude_types: self.exclude_types.clone(),
            concurrency: self.concurrency,
            detailed: self.detailed,
            advisor: self.advisor,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ScanOverrides {
    pub subscriptions: Vec<String>,
    pub resource_groups: Vec<String>,
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub detailed: bool,
    pub advisor: bool,
    pub mask: bool,
}

impl ScanOverrides {
    /// Non-empty lists replace, set options replace, flags only switch on.
    pub fn apply(&self, settings: &mut ScanSettings) {
        let replace = |target: &mut Vec<String>, value: &Vec<String>| {
            if !value.is_empty() {
                *target = value.clone();
            }
        };
        replace(&mut settings.subscriptions, &self.subscriptions);
        replace(&mut settings.resource_groups, &self.resource_groups);
        replace(&mut settings.include_types, &self.include_types);
        replace(&mut settings.exclude_types, &self.exclude_types);
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if self.timeout_secs.is_some() {
            settings.timeout_secs = self.timeout_secs;
        }
        settings.detailed |= self.detailed;
        settings.advisor |= self.advisor;
        settings.mask |= self.mask;
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.scan.validate()?;
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# cloudreview configuration

[scan]
# Subscription ids to scan. Empty scans every subscription in the inventory.
# subscriptions = ["00000000-0000-0000-0000-000000000000"]

# Only scan these resource groups (case-insensitive).
# resource_groups = ["rg-prod"]

# Resource type globs to include / exclude.
# include_types = ["Microsoft.ContainerService/*"]
# exclude_types = ["Microsoft.Network/networkSecurityGroups"]

concurrency = 8
detailed = false
advisor = false
mask = false
# timeout_secs = 600

[policy]
# Minimum impact of a broken recommendation that fails the scan (low, medium, high).
fail_on = "high"

# Recommendation IDs to ignore entirely.
# ignore_rules = ["aks-012"]

# Per-recommendation impact overrides.
# [policy.overrides]
# "aks-008" = "low"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Impact;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(".cloudreview.toml")).unwrap();
        assert_eq!(config.scan, ScanSettings::default());
        assert_eq!(config.policy.fail_on, Impact::High);
    }

    #[test]
    fn starter_config_parses() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config.scan.concurrency, 8);
        assert!(config.scan.validate().is_ok());
    }

    #[test]
    fn loads_scan_and_policy_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[scan]
subscriptions = ["sub-1"]
include_types = ["Microsoft.EventHub/*"]
concurrency = 2
advisor = true
timeout_secs = 30

[policy]
fail_on = "medium"
ignore_rules = ["evh-004"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scan.subscriptions, vec!["sub-1".to_string()]);
        assert_eq!(config.scan.timeout_secs, Some(30));
        assert!(config.policy.ignore_rules.contains("evh-004"));

        let options = config.scan.orchestrator_options();
        assert_eq!(options.concurrency, 2);
        assert!(options.advisor);
    }

    #[test]
    fn overrides_replace_only_what_is_set() {
        let mut settings = ScanSettings {
            include_types: vec!["Microsoft.Network/*".into()],
            subscriptions: vec!["sub-1".into()],
            ..ScanSettings::default()
        };
        ScanOverrides {
            subscriptions: vec!["sub-2".into()],
            concurrency: Some(3),
            mask: true,
            ..ScanOverrides::default()
        }
        .apply(&mut settings);

        assert_eq!(settings.subscriptions, vec!["sub-2".to_string()]);
        assert_eq!(settings.include_types, vec!["Microsoft.Network/*".to_string()]);
        assert_eq!(settings.concurrency, 3);
        assert!(settings.mask);
        assert!(!settings.detailed);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[scan]\nconcurrency = 0\n").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ReviewError::Configuration(_))
        ));
    }
}
