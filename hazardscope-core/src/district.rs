//! District-level rollup
//!
//! Groups facilities and hazard centers by administrative district and
//! derives an impact rate plus a rule-based campaign call per district.

use crate::geo::{self, LatLng};
use crate::matcher::FacilityImpactSummary;
use crate::model::{Facility, HazardEvent};
use crate::stats::percentage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

/// An administrative district
///
/// `boundary` is a raw ring of unknown axis order. When absent, `bounds` is
/// used instead; a district with neither contains nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

/// Containment test prepared once per district
enum Area {
    Ring(Vec<LatLng>),
    Box(Bounds),
    Empty,
}

impl Area {
    fn of(district: &District) -> Area {
        if let Some(raw) = &district.boundary {
            let ring = geo::normalize_ring(raw);
            if ring.len() >= 3 {
                return Area::Ring(ring);
            }
        }
        match district.bounds {
            Some(bounds) => Area::Box(bounds),
            None => Area::Empty,
        }
    }

    fn contains(&self, point: LatLng) -> bool {
        if !point.is_valid() {
            return false;
        }
        match self {
            Area::Ring(ring) => geo::point_in_polygon(point, ring),
            Area::Box(bounds) => bounds.contains(point),
            Area::Empty => false,
        }
    }
}

/// Rule-based call for a whole district
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistrictDecision {
    Go,
    Caution,
    Delay,
}

impl DistrictDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistrictDecision::Go => "GO",
            DistrictDecision::Caution => "CAUTION",
            DistrictDecision::Delay => "DELAY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummary {
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub total_facilities: usize,
    pub impacted_facilities: usize,
    pub disaster_count: usize,
    pub impact_rate: u32,
    pub decision: DistrictDecision,
    pub viability_score: u8,
    pub reason: String,
}

/// Decision and score from impact rate and hazard count
///
/// Score is 100 minus the impact rate minus 10 per hazard, capped at 70 for
/// CAUTION and 40 for DELAY.
pub fn district_decision(impact_rate: u32, disaster_count: usize) -> (DistrictDecision, u8) {
    let decision = if impact_rate > 50 {
        DistrictDecision::Delay
    } else if impact_rate > 20 {
        DistrictDecision::Caution
    } else {
        DistrictDecision::Go
    };

    let hazard_penalty = i64::try_from(disaster_count)
        .unwrap_or(i64::MAX / 10)
        .saturating_mul(10);
    let mut score = 100i64 - i64::from(impact_rate) - hazard_penalty;
    score = match decision {
        DistrictDecision::Delay => score.min(40),
        DistrictDecision::Caution => score.min(70),
        DistrictDecision::Go => score,
    };

    (decision, score.clamp(0, 100) as u8)
}

/// Summarize districts that contain at least one facility
///
/// Sorted by facility count (desc), then impact rate (desc), then name.
pub fn summarize_districts(
    districts: &[District],
    facilities: &[Facility],
    impacted: &[FacilityImpactSummary],
    hazards: &[HazardEvent],
) -> Vec<DistrictSummary> {
    let impacted_names: HashSet<&str> = impacted
        .iter()
        .map(|s| s.facility.name.as_str())
        .collect();

    let mut summaries: Vec<DistrictSummary> = districts
        .iter()
        .filter_map(|district| {
            let area = Area::of(district);

            let inside: Vec<&Facility> = facilities
                .iter()
                .filter(|f| area.contains(f.location()))
                .collect();
            if inside.is_empty() {
                return None;
            }

            let impacted_count = inside
                .iter()
                .filter(|f| impacted_names.contains(f.name.as_str()))
                .count();
            let disaster_count = hazards.iter().filter(|h| area.contains(h.center())).count();
            let impact_rate = percentage(impacted_count, inside.len());
            let (decision, viability_score) = district_decision(impact_rate, disaster_count);

            Some(DistrictSummary {
                district: district.name.clone(),
                country: district.country.clone(),
                region: district.region.clone(),
                total_facilities: inside.len(),
                impacted_facilities: impacted_count,
                disaster_count,
                impact_rate,
                decision,
                viability_score,
                reason: format!(
                    "{}% facilities impacted, {} disasters",
                    impact_rate, disaster_count
                ),
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_facilities
            .cmp(&a.total_facilities)
            .then_with(|| b.impact_rate.cmp(&a.impact_rate))
            .then_with(|| a.district.cmp(&b.district))
    });

    tracing::debug!(
        districts = districts.len(),
        with_facilities = summaries.len(),
        "district rollup complete"
    );

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::match_impacts;
    use crate::model::EventType;

    fn square_district(name: &str, lat: f64, lng: f64) -> District {
        District {
            name: name.to_string(),
            country: Some("Testland".to_string()),
            region: None,
            // [lng, lat] order, as GeoJSON would have it
            boundary: Some(vec![
                [lng - 1.0, lat - 1.0],
                [lng + 1.0, lat - 1.0],
                [lng + 1.0, lat + 1.0],
                [lng - 1.0, lat + 1.0],
            ]),
            bounds: None,
        }
    }

    #[test]
    fn test_district_decision_table() {
        assert_eq!(district_decision(0, 0), (DistrictDecision::Go, 100));
        assert_eq!(district_decision(10, 2), (DistrictDecision::Go, 70));
        assert_eq!(district_decision(25, 0), (DistrictDecision::Caution, 70));
        assert_eq!(district_decision(60, 0), (DistrictDecision::Delay, 40));
        assert_eq!(district_decision(100, 5), (DistrictDecision::Delay, 0));
    }

    #[test]
    fn test_summaries_sorted_and_empty_districts_dropped() {
        let districts = vec![
            square_district("Alpha", 0.0, 100.0),
            square_district("Beta", 10.0, 120.0),
            square_district("Empty", -10.0, 140.0),
        ];
        let facilities = vec![
            Facility::new("a1", 0.1, 100.1),
            Facility::new("b1", 10.1, 120.1),
            Facility::new("b2", 10.2, 120.2),
            Facility::new("b3", 10.9, 120.9),
        ];
        let hazards = vec![HazardEvent::new("wf", EventType::Wildfire, 10.15, 120.15)];
        let result = match_impacts(&facilities, &hazards);

        let summaries =
            summarize_districts(&districts, &facilities, &result.impacted_facilities, &hazards);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].district, "Beta");
        assert_eq!(summaries[0].total_facilities, 3);
        assert_eq!(summaries[0].impacted_facilities, 2);
        assert_eq!(summaries[0].impact_rate, 67);
        assert_eq!(summaries[0].disaster_count, 1);
        assert_eq!(summaries[0].decision, DistrictDecision::Delay);
        assert_eq!(summaries[1].district, "Alpha");
        assert_eq!(summaries[1].impact_rate, 0);
    }

    #[test]
    fn test_bounds_fallback() {
        let district = District {
            name: "Boxed".to_string(),
            country: None,
            region: None,
            boundary: None,
            bounds: Some(Bounds {
                min_lat: 0.0,
                max_lat: 1.0,
                min_lng: 0.0,
                max_lng: 1.0,
            }),
        };
        let facilities = vec![Facility::new("in", 0.5, 0.5), Facility::new("out", 2.0, 2.0)];
        let summaries = summarize_districts(&[district], &facilities, &[], &[]);
        assert_eq!(summaries[0].total_facilities, 1);
    }
}
