//! Hazard impact-zone resolution
//!
//! Every hazard resolves to exactly one zone: its official polygon when the
//! ring survives normalization, otherwise a circle sized from the hazard type.
//!
//! Global invariants enforced:
//! - Resolution is pure and never fails (errors degrade to the circle)
//! - A ring with fewer than 3 valid vertices is never used for containment

use crate::geo::{self, LatLng};
use crate::model::{EventType, HazardEvent};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Magnitude assumed when an earthquake title carries none
pub const DEFAULT_MAGNITUDE: f64 = 5.0;

/// Why an official polygon could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    #[error("hazard has no polygon")]
    MissingPolygon,
    #[error("polygon has {valid} valid vertices out of {raw}, need at least 3")]
    TooFewVertices { valid: usize, raw: usize },
}

/// Circle radii per hazard type, in kilometers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactRadii {
    pub km_per_magnitude: f64,
    pub default_magnitude: f64,
    pub tropical_cyclone: f64,
    pub flood: f64,
    pub volcano: f64,
    pub drought: f64,
    pub wildfire: f64,
    pub tsunami: f64,
    pub unknown: f64,
}

impl Default for ImpactRadii {
    fn default() -> Self {
        ImpactRadii {
            km_per_magnitude: 25.0,
            default_magnitude: DEFAULT_MAGNITUDE,
            tropical_cyclone: 200.0,
            flood: 70.0,
            volcano: 50.0,
            drought: 250.0,
            wildfire: 30.0,
            tsunami: 100.0,
            unknown: 50.0,
        }
    }
}

impl ImpactRadii {
    /// Fallback circle radius for a hazard
    ///
    /// Earthquakes scale with the magnitude found in the title.
    pub fn radius_km(&self, hazard: &HazardEvent) -> f64 {
        match hazard.event_type {
            EventType::Earthquake => {
                let magnitude =
                    extract_magnitude(&hazard.title).unwrap_or(self.default_magnitude);
                magnitude * self.km_per_magnitude
            }
            EventType::TropicalCyclone => self.tropical_cyclone,
            EventType::Flood => self.flood,
            EventType::Volcano => self.volcano,
            EventType::Drought => self.drought,
            EventType::Wildfire => self.wildfire,
            EventType::Tsunami => self.tsunami,
            EventType::Unknown => self.unknown,
        }
    }
}

/// First decimal number in a title ("Magnitude 6.2M" -> 6.2)
pub fn extract_magnitude(title: &str) -> Option<f64> {
    static MAGNITUDE_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = MAGNITUDE_RE.get_or_init(|| Regex::new(r"\d+\.\d+").unwrap());

    re.find(title)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|m| m.is_finite() && *m > 0.0)
}

/// Zone kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Polygon,
    Circle,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Polygon => "polygon",
            ZoneKind::Circle => "circle",
        }
    }
}

/// Concrete zone geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZoneGeometry {
    Polygon {
        ring: Vec<LatLng>,
    },
    #[serde(rename_all = "camelCase")]
    Circle { center: LatLng, radius_meters: f64 },
}

/// Resolved impact zone for one hazard
#[derive(Debug, Clone, Serialize)]
pub struct ImpactZone<'a> {
    pub hazard: &'a HazardEvent,
    pub geometry: ZoneGeometry,
}

impl ImpactZone<'_> {
    pub fn kind(&self) -> ZoneKind {
        match self.geometry {
            ZoneGeometry::Polygon { .. } => ZoneKind::Polygon,
            ZoneGeometry::Circle { .. } => ZoneKind::Circle,
        }
    }

    /// Containment test for a facility location
    pub fn contains(&self, point: LatLng) -> bool {
        match &self.geometry {
            ZoneGeometry::Polygon { ring } => geo::point_in_polygon(point, ring),
            ZoneGeometry::Circle {
                center,
                radius_meters,
            } => geo::haversine_km(point, *center) <= radius_meters / 1000.0,
        }
    }

    pub fn area_km2(&self) -> f64 {
        match &self.geometry {
            ZoneGeometry::Polygon { ring } => geo::ring_area_km2(ring),
            ZoneGeometry::Circle { radius_meters, .. } => {
                geo::circle_area_km2(radius_meters / 1000.0)
            }
        }
    }
}

/// Build the official ring, normalized and validated
pub fn polygon_ring(hazard: &HazardEvent) -> Result<Vec<LatLng>, ZoneError> {
    let raw = hazard.polygon.as_deref().ok_or(ZoneError::MissingPolygon)?;
    let ring = geo::normalize_ring(raw);
    if ring.len() < 3 {
        return Err(ZoneError::TooFewVertices {
            valid: ring.len(),
            raw: raw.len(),
        });
    }
    Ok(ring)
}

/// Resolve a hazard's impact zone with default radii
pub fn resolve_impact_zone(hazard: &HazardEvent) -> ImpactZone<'_> {
    resolve_impact_zone_with_radii(hazard, &ImpactRadii::default())
}

/// Resolve a hazard's impact zone with custom radii
pub fn resolve_impact_zone_with_radii<'a>(
    hazard: &'a HazardEvent,
    radii: &ImpactRadii,
) -> ImpactZone<'a> {
    let geometry = match polygon_ring(hazard) {
        Ok(ring) => ZoneGeometry::Polygon { ring },
        Err(err) => {
            if err != ZoneError::MissingPolygon {
                tracing::debug!(hazard = %hazard.id, "falling back to circle zone: {}", err);
            }
            ZoneGeometry::Circle {
                center: hazard.center(),
                radius_meters: radii.radius_km(hazard) * 1000.0,
            }
        }
    };

    ImpactZone { hazard, geometry }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quake(title: &str) -> HazardEvent {
        HazardEvent::new("eq-1", EventType::Earthquake, 10.0, 20.0).with_title(title)
    }

    fn radius_km(zone: &ImpactZone) -> f64 {
        match zone.geometry {
            ZoneGeometry::Circle { radius_meters, .. } => radius_meters / 1000.0,
            ZoneGeometry::Polygon { .. } => panic!("expected circle"),
        }
    }

    #[test]
    fn test_magnitude_from_title() {
        assert_eq!(extract_magnitude("Magnitude 6.2M, Depth:10km"), Some(6.2));
        assert_eq!(extract_magnitude("M 7 quake"), None);
        assert_eq!(extract_magnitude(""), None);
    }

    #[test]
    fn test_earthquake_radius_scales_with_magnitude() {
        let hazard = quake("Orange earthquake alert (Magnitude 6.0M) in Chile");
        let zone = resolve_impact_zone(&hazard);
        assert_eq!(zone.kind(), ZoneKind::Circle);
        assert_eq!(radius_km(&zone), 150.0);

        let no_mag = quake("Earthquake in Chile");
        assert_eq!(radius_km(&resolve_impact_zone(&no_mag)), 125.0);
    }

    #[test]
    fn test_type_radius_table() {
        let cases = [
            (EventType::TropicalCyclone, 200.0),
            (EventType::Flood, 70.0),
            (EventType::Volcano, 50.0),
            (EventType::Drought, 250.0),
            (EventType::Wildfire, 30.0),
            (EventType::Tsunami, 100.0),
            (EventType::Unknown, 50.0),
        ];
        for (event_type, expected) in cases {
            let hazard = HazardEvent::new("h", event_type, 0.0, 0.0);
            assert_eq!(radius_km(&resolve_impact_zone(&hazard)), expected);
        }
    }

    #[test]
    fn test_short_polygon_falls_back_to_circle() {
        let two_points = quake("M 6.0").with_polygon(vec![[10.0, 20.0], [11.0, 21.0]]);
        assert_eq!(resolve_impact_zone(&two_points).kind(), ZoneKind::Circle);

        let empty = quake("M 6.0").with_polygon(vec![]);
        assert_eq!(resolve_impact_zone(&empty).kind(), ZoneKind::Circle);

        // Three raw vertices but one out of range
        let invalid = quake("M 6.0").with_polygon(vec![[10.0, 20.0], [11.0, 21.0], [10.0, 500.0]]);
        assert_eq!(
            polygon_ring(&invalid),
            Err(ZoneError::TooFewVertices { valid: 2, raw: 3 })
        );
        assert_eq!(resolve_impact_zone(&invalid).kind(), ZoneKind::Circle);
    }

    #[test]
    fn test_polygon_zone_contains_center() {
        let hazard = HazardEvent::new("fl-1", EventType::Flood, 5.0, 100.0).with_polygon(vec![
            [99.0, 4.0],
            [101.0, 4.0],
            [101.0, 6.0],
            [99.0, 6.0],
        ]);
        let zone = resolve_impact_zone(&hazard);
        assert_eq!(zone.kind(), ZoneKind::Polygon);
        assert!(zone.contains(hazard.center()));
        assert!(!zone.contains(LatLng::new(7.0, 100.0)));
        assert!(zone.area_km2() > 0.0);
    }

    #[test]
    fn test_circle_contains_center_and_edge() {
        let hazard = HazardEvent::new("wf-1", EventType::Wildfire, 0.0, 0.0);
        let zone = resolve_impact_zone(&hazard);
        assert!(zone.contains(hazard.center()));
        // 0.2 degrees of latitude is about 22 km, inside the 30 km radius
        assert!(zone.contains(LatLng::new(0.2, 0.0)));
        assert!(!zone.contains(LatLng::new(0.5, 0.0)));
    }
}
