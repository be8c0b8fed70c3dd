//! Geometry utilities
//!
//! Global invariants enforced:
//! - Rings are planar in lat/lng space (acceptable at hazard scales)
//! - Invalid coordinates are dropped, never coerced to 0
//! - Axis-order detection runs once per ring, from its first vertex

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude (and of longitude at the equator)
const KM_PER_DEG: f64 = 111.32;

/// A point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lat, self.lng)
    }
}

/// Both components finite and inside their domain ranges
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// Haversine great-circle distance in kilometers
pub fn haversine_km(from: LatLng, to: LatLng) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Ray-casting point-in-polygon test
///
/// Rings with fewer than 3 vertices cannot contain anything.
pub fn point_in_polygon(point: LatLng, ring: &[LatLng]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lng, ring[i].lat);
        let (xj, yj) = (ring[j].lng, ring[j].lat);
        if (yi > y) != (yj > y) {
            let intersect_x = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// True when the ring was written in [lng, lat] order
///
/// Sampled from the first vertex only: a first component beyond ±90 cannot
/// be a latitude. Values at or below 90 are read as [lat, lng].
pub fn needs_axis_swap(raw: &[[f64; 2]]) -> bool {
    raw.first().is_some_and(|first| first[0].abs() > 90.0)
}

/// Put a raw ring into [lat, lng] order and drop invalid vertices
///
/// The swap decision is made once and applied to every vertex, so winding
/// and closure are preserved.
pub fn normalize_ring(raw: &[[f64; 2]]) -> Vec<LatLng> {
    let swap = needs_axis_swap(raw);
    raw.iter()
        .map(|pair| {
            if swap {
                LatLng::new(pair[1], pair[0])
            } else {
                LatLng::new(pair[0], pair[1])
            }
        })
        .filter(LatLng::is_valid)
        .collect()
}

/// Parse a CAP `<polygon>` string ("a,b a,b ...") into raw pairs
///
/// Axis order is left untouched; pass the result to [`normalize_ring`].
pub fn parse_cap_polygon(text: &str) -> Vec<[f64; 2]> {
    text.split_whitespace()
        .filter_map(|token| {
            let (a, b) = token.split_once(',')?;
            if b.contains(',') {
                return None;
            }
            let a = a.trim().parse::<f64>().ok()?;
            let b = b.trim().parse::<f64>().ok()?;
            (a.is_finite() && b.is_finite()).then_some([a, b])
        })
        .collect()
}

/// Area of a ring in km² (shoelace over an equirectangular projection)
pub fn ring_area_km2(ring: &[LatLng]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let mean_lat = ring.iter().map(|p| p.lat).sum::<f64>() / n as f64;
    let x_scale = KM_PER_DEG * mean_lat.to_radians().cos();

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let (xi, yi) = (ring[i].lng * x_scale, ring[i].lat * KM_PER_DEG);
        let (xj, yj) = (ring[j].lng * x_scale, ring[j].lat * KM_PER_DEG);
        area += xi * yj - xj * yi;
    }
    (area / 2.0).abs()
}

pub fn circle_area_km2(radius_km: f64) -> f64 {
    std::f64::consts::PI * radius_km * radius_km
}
