//! Hazardscope core library - facility impact matching and campaign viability scoring

#![deny(warnings)]

// Global invariants enforced in this crate:
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Deterministic ordering must be explicit
// - Malformed records are skipped, never fatal to a pass
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod district;
pub mod filter;
pub mod geo;
pub mod matcher;
pub mod model;
pub mod report;
pub mod security;
pub mod session;
pub mod stats;
pub mod viability;
pub mod zone;

pub use config::ResolvedConfig;
pub use district::{District, DistrictSummary};
pub use filter::{filter_hazards, HazardFilter};
pub use matcher::{find_overlaps, match_impacts, FacilityImpactSummary, Impact, MatchResult};
pub use model::{AlertLevel, EventType, Facility, HazardEvent};
pub use report::{render_brief, render_json, render_text, sort_assessments};
pub use security::{assess_security, SecurityAssessment, SecurityLevel};
pub use session::{ImpactReport, Session};
pub use stats::{aggregate_statistics, Statistics};
pub use viability::{assess_viability, Decision, ViabilityAssessment};
pub use zone::{resolve_impact_zone, ImpactZone};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a JSON array of records (facilities, hazards, incidents, districts)
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(records)
}

/// Match and aggregate with default configuration
pub fn analyze(facilities: &[Facility], hazards: &[HazardEvent]) -> (MatchResult, Statistics) {
    let result = match_impacts(facilities, hazards);
    let stats = aggregate_statistics(facilities, hazards, &result.impacted_facilities);
    (result, stats)
}

/// Filter hazards, then match and aggregate with resolved configuration
pub fn analyze_with_config(
    facilities: &[Facility],
    hazards: &[HazardEvent],
    config: &ResolvedConfig,
) -> (MatchResult, Statistics) {
    let visible = visible_hazards(hazards, config);
    let result = matcher::match_impacts_with_radii(facilities, &visible, &config.radii);
    let stats = stats::aggregate_statistics_with_radii(
        facilities,
        &visible,
        &result.impacted_facilities,
        &config.radii,
    );
    (result, stats)
}

/// Filter hazards, then match and roll up districts from the same filtered list
pub fn districts_with_config(
    districts: &[District],
    facilities: &[Facility],
    hazards: &[HazardEvent],
    config: &ResolvedConfig,
) -> (MatchResult, Vec<DistrictSummary>) {
    let visible = visible_hazards(hazards, config);
    let result = matcher::match_impacts_with_radii(facilities, &visible, &config.radii);
    let summaries =
        district::summarize_districts(districts, facilities, &result.impacted_facilities, &visible);
    (result, summaries)
}

fn visible_hazards(hazards: &[HazardEvent], config: &ResolvedConfig) -> Vec<HazardEvent> {
    let visible = filter_hazards(hazards, &config.filter);
    if visible.len() < hazards.len() {
        tracing::debug!(
            kept = visible.len(),
            dropped = hazards.len() - visible.len(),
            "hazard filter applied"
        );
    }
    visible
}
