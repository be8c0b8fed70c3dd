//! Dashboard statistics
//!
//! Global invariants enforced:
//! - Statistics are strictly derived from an existing matching pass
//! - Matching is never re-run here
//! - Deterministic ordering

use crate::filter::{alert_level_counts, AlertLevelCounts};
use crate::matcher::{find_overlaps, FacilityImpactSummary, OverlapRecord};
use crate::model::{AlertLevel, EventType, Facility, HazardEvent};
use crate::zone::{resolve_impact_zone_with_radii, ImpactRadii, ZoneKind};
use serde::Serialize;
use std::collections::HashMap;

/// Per-hazard rollup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardStats {
    pub id: String,
    pub name: String,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_level: Option<AlertLevel>,
    pub zone_kind: ZoneKind,
    pub affected_facilities: usize,
    pub impact_area_km2: f64,
}

/// Dashboard rollup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_facilities: usize,
    pub total_hazards: usize,
    pub impacted_facilities: usize,
    pub percentage_impacted: u32,
    pub alert_levels: AlertLevelCounts,
    pub hazards: Vec<HazardStats>,
    pub overlaps: Vec<OverlapRecord>,
}

/// Round-half-up percentage; 0 when there is nothing to divide by
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

pub fn aggregate_statistics(
    facilities: &[Facility],
    hazards: &[HazardEvent],
    impacted: &[FacilityImpactSummary],
) -> Statistics {
    aggregate_statistics_with_radii(facilities, hazards, impacted, &ImpactRadii::default())
}

/// Aggregate statistics, sizing circle zones with custom radii
///
/// Only records the matcher accepts are counted: malformed facilities stay
/// out of the percentage denominator, and hazards without a valid center get
/// no rollup entry.
pub fn aggregate_statistics_with_radii(
    facilities: &[Facility],
    hazards: &[HazardEvent],
    impacted: &[FacilityImpactSummary],
    radii: &ImpactRadii,
) -> Statistics {
    let mut affected: HashMap<&str, usize> = HashMap::new();
    for summary in impacted {
        for impact in &summary.impacts {
            *affected.entry(impact.disaster.id.as_str()).or_insert(0) += 1;
        }
    }

    let facility_count = facilities.iter().filter(|f| f.is_well_formed()).count();
    let located: Vec<&HazardEvent> = hazards.iter().filter(|h| h.center().is_valid()).collect();

    let mut hazard_stats: Vec<HazardStats> = located
        .iter()
        .map(|&hazard| {
            let zone = resolve_impact_zone_with_radii(hazard, radii);
            HazardStats {
                id: hazard.id.clone(),
                name: hazard.display_name().to_string(),
                event_type: hazard.event_type,
                alert_level: hazard.alert_level,
                zone_kind: zone.kind(),
                affected_facilities: affected.get(hazard.id.as_str()).copied().unwrap_or(0),
                impact_area_km2: zone.area_km2().round(),
            }
        })
        .collect();

    // Most affected first, id as tie-breaker
    hazard_stats.sort_by(|a, b| {
        b.affected_facilities
            .cmp(&a.affected_facilities)
            .then_with(|| a.id.cmp(&b.id))
    });

    Statistics {
        total_facilities: facility_count,
        total_hazards: located.len(),
        impacted_facilities: impacted.len(),
        percentage_impacted: percentage(impacted.len(), facility_count),
        alert_levels: alert_level_counts(located.iter().copied()),
        hazards: hazard_stats,
        overlaps: find_overlaps(impacted),
    }
}
