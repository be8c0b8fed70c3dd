//! Configuration file support for Hazardscope
//!
//! Loads deployment-specific tuning (zone radii, decision thresholds, conflict
//! window, default hazard filter) from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.hazardscoperc.json` in the working directory
//! 3. `hazardscope.config.json` in the working directory
//!
//! All fields are optional; missing fields take the built-in defaults.

use crate::filter::HazardFilter;
use crate::model::{AlertLevel, EventType};
use crate::security::ConflictSettings;
use crate::viability::DecisionThresholds;
use crate::zone::ImpactRadii;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest circle radius accepted, in km
const MAX_RADIUS_KM: f64 = 5000.0;

/// Hazardscope configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HazardscopeConfig {
    /// Fallback circle radii per hazard type
    #[serde(default)]
    pub radii: Option<RadiiConfig>,

    /// Viability decision thresholds
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Conflict-incident assessment settings
    #[serde(default)]
    pub conflict: Option<ConflictConfig>,

    /// Default hazard filter applied before matching
    #[serde(default)]
    pub filter: Option<FilterConfig>,
}

/// Circle radii in km, keyed by hazard type code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadiiConfig {
    /// Earthquake radius per unit of magnitude (default: 25.0)
    pub km_per_magnitude: Option<f64>,
    /// Magnitude assumed when the title has none (default: 5.0)
    pub default_magnitude: Option<f64>,
    /// Tropical cyclone (default: 200.0)
    pub tc: Option<f64>,
    /// Flood (default: 70.0)
    pub fl: Option<f64>,
    /// Volcano (default: 50.0)
    pub vo: Option<f64>,
    /// Drought (default: 250.0)
    pub dr: Option<f64>,
    /// Wildfire (default: 30.0)
    pub wf: Option<f64>,
    /// Tsunami (default: 100.0)
    pub ts: Option<f64>,
    /// Unrecognized hazard types (default: 50.0)
    pub unknown: Option<f64>,
}

/// Viability decision thresholds (inclusive lower bounds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Minimum score for GO (default: 70)
    pub go: Option<u8>,
    /// Minimum score for PROCEED WITH CAUTION (default: 40)
    pub caution: Option<u8>,
    /// Minimum score for DELAY RECOMMENDED (default: 20)
    pub delay: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConflictConfig {
    /// Incident look-back window in days (default: 60)
    pub window_days: Option<u32>,
}

/// Default hazard filter; empty lists allow everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub alert_levels: Vec<String>,
    #[serde(default)]
    pub severities: Vec<String>,
    #[serde(default)]
    pub certainties: Vec<String>,
    #[serde(default)]
    pub urgencies: Vec<String>,
}

/// Resolved configuration with defaults filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub radii: ImpactRadii,
    pub thresholds: DecisionThresholds,
    pub conflict: ConflictSettings,
    pub filter: HazardFilter,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl HazardscopeConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref r) = self.radii {
            for (name, value) in [
                ("km_per_magnitude", r.km_per_magnitude),
                ("tc", r.tc),
                ("fl", r.fl),
                ("vo", r.vo),
                ("dr", r.dr),
                ("wf", r.wf),
                ("ts", r.ts),
                ("unknown", r.unknown),
            ] {
                if let Some(v) = value {
                    if !v.is_finite() || v <= 0.0 {
                        anyhow::bail!("radii.{} must be positive (got {})", name, v);
                    }
                    if v > MAX_RADIUS_KM {
                        anyhow::bail!(
                            "radii.{} must be at most {} km (got {})",
                            name,
                            MAX_RADIUS_KM,
                            v
                        );
                    }
                }
            }

            if let Some(m) = r.default_magnitude {
                if !(m > 0.0 && m <= 10.0) {
                    anyhow::bail!("radii.default_magnitude must be in (0, 10] (got {})", m);
                }
            }
        }

        if let Some(ref t) = self.thresholds {
            let defaults = DecisionThresholds::default();
            let go = t.go.unwrap_or(defaults.go);
            let caution = t.caution.unwrap_or(defaults.caution);
            let delay = t.delay.unwrap_or(defaults.delay);

            for (name, value) in [("go", go), ("caution", caution), ("delay", delay)] {
                if value == 0 || value > 100 {
                    anyhow::bail!("thresholds.{} must be in 1..=100 (got {})", name, value);
                }
            }
            if delay >= caution {
                anyhow::bail!(
                    "thresholds.delay ({}) must be less than thresholds.caution ({})",
                    delay,
                    caution
                );
            }
            if caution >= go {
                anyhow::bail!(
                    "thresholds.caution ({}) must be less than thresholds.go ({})",
                    caution,
                    go
                );
            }
        }

        if let Some(ref c) = self.conflict {
            if c.window_days == Some(0) {
                anyhow::bail!("conflict.window_days must be positive (got 0)");
            }
        }

        if let Some(ref f) = self.filter {
            for code in &f.event_types {
                if EventType::parse_known(code).is_none() {
                    anyhow::bail!("filter.event_types: unknown hazard type code: {}", code);
                }
            }
            for level in &f.alert_levels {
                if AlertLevel::parse(level).is_none() {
                    anyhow::bail!("filter.alert_levels: unknown alert level: {}", level);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into the typed settings used by the core
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let defaults = ImpactRadii::default();
        let radii = match &self.radii {
            Some(r) => ImpactRadii {
                km_per_magnitude: r.km_per_magnitude.unwrap_or(defaults.km_per_magnitude),
                default_magnitude: r.default_magnitude.unwrap_or(defaults.default_magnitude),
                tropical_cyclone: r.tc.unwrap_or(defaults.tropical_cyclone),
                flood: r.fl.unwrap_or(defaults.flood),
                volcano: r.vo.unwrap_or(defaults.volcano),
                drought: r.dr.unwrap_or(defaults.drought),
                wildfire: r.wf.unwrap_or(defaults.wildfire),
                tsunami: r.ts.unwrap_or(defaults.tsunami),
                unknown: r.unknown.unwrap_or(defaults.unknown),
            },
            None => defaults,
        };

        let default_thresholds = DecisionThresholds::default();
        let thresholds = match &self.thresholds {
            Some(t) => DecisionThresholds {
                go: t.go.unwrap_or(default_thresholds.go),
                caution: t.caution.unwrap_or(default_thresholds.caution),
                delay: t.delay.unwrap_or(default_thresholds.delay),
            },
            None => default_thresholds,
        };

        let conflict = ConflictSettings {
            window_days: self
                .conflict
                .as_ref()
                .and_then(|c| c.window_days)
                .unwrap_or(ConflictSettings::default().window_days),
        };

        let filter = match &self.filter {
            Some(f) => HazardFilter::allow_all()
                .with_event_types(f.event_types.iter().filter_map(|c| EventType::parse_known(c)))
                .with_alert_levels(f.alert_levels.iter().filter_map(|l| AlertLevel::parse(l)))
                .with_severities(&f.severities)
                .with_certainties(&f.certainties)
                .with_urgencies(&f.urgencies),
            None => HazardFilter::allow_all(),
        };

        Ok(ResolvedConfig {
            radii,
            thresholds,
            conflict,
            filter,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        HazardscopeConfig::default().resolve()
    }
}

/// Discover and load a config file from a directory
///
/// Search order:
/// 1. `.hazardscoperc.json`
/// 2. `hazardscope.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(HazardscopeConfig, PathBuf)>> {
    let rc_path = root.join(".hazardscoperc.json");
    if rc_path.exists() {
        let config = load_config_file(&rc_path)?;
        return Ok(Some((config, rc_path)));
    }

    let config_path = root.join("hazardscope.config.json");
    if config_path.exists() {
        let config = load_config_file(&config_path)?;
        return Ok(Some((config, config_path)));
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<HazardscopeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: HazardscopeConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (HazardscopeConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = HazardscopeConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert_eq!(resolved.radii, ImpactRadii::default());
        assert_eq!(resolved.thresholds, DecisionThresholds::default());
        assert_eq!(resolved.conflict.window_days, 60);
        assert_eq!(resolved.filter, HazardFilter::allow_all());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "radii": {"km_per_magnitude": 30.0, "default_magnitude": 4.5, "tc": 250.0},
            "thresholds": {"go": 80, "caution": 50, "delay": 25},
            "conflict": {"window_days": 30},
            "filter": {"event_types": ["EQ", "fl"], "alert_levels": ["red"], "severities": ["Severe"]}
        }"#;
        let config: HazardscopeConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.radii.km_per_magnitude, 30.0);
        assert_eq!(resolved.radii.default_magnitude, 4.5);
        assert_eq!(resolved.radii.tropical_cyclone, 250.0);
        assert_eq!(resolved.radii.flood, 70.0);
        assert_eq!(resolved.thresholds.go, 80);
        assert_eq!(resolved.conflict.window_days, 30);
        assert_eq!(resolved.filter.event_types.len(), 2);
        assert!(resolved.filter.alert_levels.contains(&AlertLevel::Red));
        assert!(resolved.filter.severities.contains("severe"));
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<HazardscopeConfig, _> =
            serde_json::from_str(r#"{"unknown_field": true}"#);
        assert!(result.is_err(), "unknown fields should be rejected");

        let result: Result<HazardscopeConfig, _> =
            serde_json::from_str(r#"{"radii": {"xx": 5.0}}"#);
        assert!(result.is_err(), "unknown radius keys should be rejected");
    }

    #[test]
    fn test_reject_bad_radii() {
        for json in [
            r#"{"radii": {"fl": 0.0}}"#,
            r#"{"radii": {"fl": -5.0}}"#,
            r#"{"radii": {"dr": 6000.0}}"#,
            r#"{"radii": {"default_magnitude": 11.0}}"#,
            r#"{"radii": {"default_magnitude": 0.0}}"#,
        ] {
            let config: HazardscopeConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "should reject {}", json);
        }
    }

    #[test]
    fn test_reject_unordered_thresholds() {
        let json = r#"{"thresholds": {"go": 40, "caution": 70}}"#;
        let config: HazardscopeConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());

        let json = r#"{"thresholds": {"delay": 0}}"#;
        let config: HazardscopeConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_zero_window() {
        let config: HazardscopeConfig =
            serde_json::from_str(r#"{"conflict": {"window_days": 0}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_unknown_filter_codes() {
        let config: HazardscopeConfig =
            serde_json::from_str(r#"{"filter": {"event_types": ["zz"]}}"#).unwrap();
        assert!(config.validate().is_err());

        let config: HazardscopeConfig =
            serde_json::from_str(r#"{"filter": {"alert_levels": ["purple"]}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".hazardscoperc.json");
        fs::write(&config_path, r#"{"conflict": {"window_days": 10}}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.conflict.unwrap().window_days, Some(10));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_config_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("hazardscope.config.json"),
            r#"{"thresholds": {"go": 75}}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.thresholds.unwrap().go, Some(75));
    }

    #[test]
    fn test_other_json_files_not_searched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "dashboard", "hazardscope": {"radii": {"wf": 40.0}}}"#,
        )
        .unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());

        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".hazardscoperc.json"),
            r#"{"conflict": {"window_days": 1}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("hazardscope.config.json"),
            r#"{"conflict": {"window_days": 2}}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.conflict.unwrap().window_days,
            Some(1),
            ".hazardscoperc.json should take priority"
        );
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"radii": {"fl": -1.0}}"#).unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.json"));
    }

    #[test]
    fn test_load_and_resolve_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.thresholds.go, 70);
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"radii": {"unknown": 80.0}}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.radii.unknown, 80.0);
        assert_eq!(resolved.config_path, Some(config_path));
    }
}
