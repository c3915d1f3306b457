//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. FUNNEL_CONFIG environment variable
//! 3. Default: config/funnel.toml

use crate::domain::types::TerminalId;
use crate::infra::lookup::{
    DwellThresholdSet, RssiThresholds, TenantMapping, ThresholdConfig, DEFAULT_DWELL_THRESHOLDS,
};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VenueConfig {
    /// Venue identifier (e.g., "taipei-101")
    #[serde(default = "default_venue_id")]
    pub id: String,
}

fn default_venue_id() -> String {
    "venue".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DwellConfig {
    /// Dwell-duration thresholds in seconds
    #[serde(default = "default_dwell_thresholds")]
    pub thresholds_secs: Vec<u64>,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self { thresholds_secs: default_dwell_thresholds() }
    }
}

fn default_dwell_thresholds() -> Vec<u64> {
    DEFAULT_DWELL_THRESHOLDS.to_vec()
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct TerminalThresholdConfig {
    #[serde(default)]
    pub pass_by: Option<f64>,
    #[serde(default)]
    pub entry: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub dwell: DwellConfig,
    /// terminalId = "tenantName"
    #[serde(default)]
    pub tenants: HashMap<String, String>,
    /// [thresholds.<terminalId>] pass_by / entry
    #[serde(default)]
    pub thresholds: HashMap<String, TerminalThresholdConfig>,
}

/// Engine configuration used to build indicator lookup tables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    venue_id: String,
    dwell_thresholds_secs: Vec<u64>,
    tenants: HashMap<String, String>,
    thresholds: HashMap<String, TerminalThresholdConfig>,
    config_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            venue_id: default_venue_id(),
            dwell_thresholds_secs: default_dwell_thresholds(),
            tenants: HashMap::new(),
            thresholds: HashMap::new(),
            config_file: "default".to_string(),
        }
    }
}

impl EngineConfig {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("FUNNEL_CONFIG") {
            return path;
        }

        "config/funnel.toml".to_string()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig =
            toml::from_str(content).context("Failed to parse funnel config")?;
        Ok(Self::from_toml(toml_config, "inline"))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            venue_id: toml_config.venue.id,
            dwell_thresholds_secs: toml_config.dwell.thresholds_secs,
            tenants: toml_config.tenants,
            thresholds: toml_config.thresholds,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path, error = %e, "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration - resolves the path from args, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn dwell_thresholds_secs(&self) -> &[u64] {
        &self.dwell_thresholds_secs
    }

    pub fn dwell_thresholds(&self) -> DwellThresholdSet {
        DwellThresholdSet::new(&self.dwell_thresholds_secs)
    }

    pub fn tenant_mapping(&self) -> TenantMapping {
        self.tenants
            .iter()
            .map(|(terminal, tenant)| (TerminalId(terminal.clone()), tenant.clone()))
            .collect()
    }

    pub fn threshold_config(&self) -> ThresholdConfig {
        self.thresholds
            .iter()
            .map(|(terminal, t)| {
                (TerminalId(terminal.clone()), RssiThresholds { pass_by: t.pass_by, entry: t.entry })
            })
            .collect()
    }

    /// Builder method for tests to set dwell thresholds
    #[cfg(test)]
    pub fn with_dwell_thresholds(mut self, secs: &[u64]) -> Self {
        self.dwell_thresholds_secs = secs.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::lookup::ThresholdRegime;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.venue_id(), "venue");
        assert_eq!(config.dwell_thresholds_secs(), &[60, 180, 300]);
        assert!(config.tenant_mapping().is_empty());
        assert!(config.threshold_config().is_empty());
    }

    #[test]
    fn test_from_toml_str() {
        let config = EngineConfig::from_toml_str(
            r#"
[venue]
id = "mall-a"

[dwell]
thresholds_secs = [30, 90]

[tenants]
T001 = "Cafe"
T002 = "Books"

[thresholds.T001]
pass_by = -75
entry = -60

[thresholds.T002]
entry = -55
"#,
        )
        .unwrap();

        assert_eq!(config.venue_id(), "mall-a");
        assert_eq!(config.dwell_thresholds().as_slice(), &[30, 90]);

        let mapping = config.tenant_mapping();
        assert_eq!(mapping.tenant_for(&TerminalId::from("T002")), "Books");

        let thresholds = config.threshold_config();
        let t1 = TerminalId::from("T001");
        let t2 = TerminalId::from("T002");
        assert_eq!(thresholds.threshold(&t1, ThresholdRegime::PassBy), Some(-75.0));
        assert_eq!(thresholds.threshold(&t1, ThresholdRegime::Entry), Some(-60.0));
        assert_eq!(thresholds.threshold(&t2, ThresholdRegime::PassBy), None);
        assert_eq!(thresholds.threshold(&t2, ThresholdRegime::Entry), Some(-55.0));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.venue_id(), "venue");
        assert_eq!(config.dwell_thresholds_secs(), &[60, 180, 300]);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(EngineConfig::from_toml_str("[dwell]\nthresholds_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_with_dwell_thresholds() {
        let config = EngineConfig::default().with_dwell_thresholds(&[120]);
        assert_eq!(config.dwell_thresholds().as_slice(), &[120]);
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> =
            vec!["report".to_string(), "--config".to_string(), "config/mall.toml".to_string()];
        assert_eq!(EngineConfig::resolve_config_path(&args), "config/mall.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> = vec!["report".to_string(), "--config=config/b.toml".to_string()];
        assert_eq!(EngineConfig::resolve_config_path(&args), "config/b.toml");
    }
}
