//! Facility-impact matching
//!
//! Global invariants enforced:
//! - Every facility × hazard pair is tested exactly once per pass
//! - Zones are resolved once per hazard, never per pair
//! - Output order follows input order (facilities, then hazards)
//! - Malformed records are skipped and counted, never fatal

use crate::geo;
use crate::model::{Facility, HazardEvent};
use crate::zone::{resolve_impact_zone_with_radii, ImpactRadii, ImpactZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One facility inside one hazard's zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub facility: Facility,
    pub disaster: HazardEvent,
    /// Haversine distance to the hazard center, even for polygon zones
    pub distance_km: f64,
    pub within_zone: bool,
}

/// All impacts for one facility (only built when there is at least one)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityImpactSummary {
    pub facility: Facility,
    pub impacts: Vec<Impact>,
}

/// Result of a full matching pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub impacted_facilities: Vec<FacilityImpactSummary>,
    /// Hazard id -> names of facilities inside its zone (every valid hazard listed)
    pub by_hazard: BTreeMap<String, Vec<String>>,
    pub skipped_facilities: usize,
    pub skipped_hazards: usize,
}

impl MatchResult {
    pub fn impacted_count(&self) -> usize {
        self.impacted_facilities.len()
    }

    pub fn impacts_for(&self, facility_name: &str) -> &[Impact] {
        self.impacted_facilities
            .iter()
            .find(|s| s.facility.name == facility_name)
            .map(|s| s.impacts.as_slice())
            .unwrap_or(&[])
    }
}

/// A pair of hazards whose zones share facilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRecord {
    /// Display names of the two hazards, in feed order
    pub disasters: [String; 2],
    pub facilities: Vec<String>,
}

/// Match facilities against hazards with default radii
pub fn match_impacts(facilities: &[Facility], hazards: &[HazardEvent]) -> MatchResult {
    match_impacts_with_radii(facilities, hazards, &ImpactRadii::default())
}

/// Match facilities against hazards with custom circle radii
pub fn match_impacts_with_radii(
    facilities: &[Facility],
    hazards: &[HazardEvent],
    radii: &ImpactRadii,
) -> MatchResult {
    let mut result = MatchResult::default();

    let zones: Vec<ImpactZone> = hazards
        .iter()
        .filter(|hazard| {
            let valid = hazard.center().is_valid();
            if !valid {
                tracing::warn!(hazard = %hazard.id, "skipping hazard with invalid coordinates");
            }
            valid
        })
        .map(|hazard| resolve_impact_zone_with_radii(hazard, radii))
        .collect();
    result.skipped_hazards = hazards.len() - zones.len();

    for zone in &zones {
        result.by_hazard.entry(zone.hazard.id.clone()).or_default();
    }

    for facility in facilities {
        if !facility.is_well_formed() {
            tracing::warn!(facility = %facility.name, "skipping malformed facility");
            result.skipped_facilities += 1;
            continue;
        }

        let location = facility.location();
        let impacts: Vec<Impact> = zones
            .iter()
            .filter(|zone| zone.contains(location))
            .map(|zone| Impact {
                facility: facility.clone(),
                disaster: zone.hazard.clone(),
                distance_km: round2(geo::haversine_km(location, zone.hazard.center())),
                within_zone: true,
            })
            .collect();

        if impacts.is_empty() {
            continue;
        }

        for impact in &impacts {
            if let Some(names) = result.by_hazard.get_mut(&impact.disaster.id) {
                names.push(facility.name.clone());
            }
        }

        result.impacted_facilities.push(FacilityImpactSummary {
            facility: facility.clone(),
            impacts,
        });
    }

    tracing::debug!(
        facilities = facilities.len(),
        hazards = zones.len(),
        impacted = result.impacted_facilities.len(),
        "matching pass complete"
    );

    result
}

/// Every pair of hazards that both contain at least one facility
///
/// Records appear in the order their first shared facility is seen.
pub fn find_overlaps(impacted: &[FacilityImpactSummary]) -> Vec<OverlapRecord> {
    let mut records: Vec<OverlapRecord> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for summary in impacted.iter().filter(|s| s.impacts.len() >= 2) {
        for (i, first) in summary.impacts.iter().enumerate() {
            for second in &summary.impacts[i + 1..] {
                let key = (first.disaster.id.clone(), second.disaster.id.clone());
                let slot = *index.entry(key).or_insert_with(|| {
                    records.push(OverlapRecord {
                        disasters: [
                            first.disaster.display_name().to_string(),
                            second.disaster.display_name().to_string(),
                        ],
                        facilities: Vec::new(),
                    });
                    records.len() - 1
                });
                records[slot].facilities.push(summary.facility.name.clone());
            }
        }
    }

    records
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
