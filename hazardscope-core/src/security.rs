//! Conflict-incident security assessment
//!
//! Scores the security situation around a facility from armed-conflict
//! incident records (ACLED-style), bucketing incidents into distance zones.
//!
//! Global invariants enforced:
//! - The reference date is an explicit input (no clock reads)
//! - Incidents at or beyond 100 km never contribute
//! - An empty incident feed yields UNKNOWN, which carries no penalty

use crate::geo::{self, LatLng};
use crate::model::{lenient_f64, nan, value_to_f64, Facility};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// One conflict incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub event_date: NaiveDate,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub longitude: f64,
    #[serde(default)]
    pub event_type: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub fatalities: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ConflictEvent {
    pub fn location_point(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.min(u32::MAX as f64) as u32)
        .unwrap_or(0))
}

/// Security level of an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityLevel {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl SecurityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Critical => "CRITICAL",
            SecurityLevel::High => "HIGH",
            SecurityLevel::Medium => "MEDIUM",
            SecurityLevel::Low => "LOW",
            SecurityLevel::Unknown => "UNKNOWN",
        }
    }

    fn from_risk_score(score: f64) -> SecurityLevel {
        if score >= 100.0 {
            SecurityLevel::Critical
        } else if score >= 50.0 {
            SecurityLevel::High
        } else if score >= 20.0 {
            SecurityLevel::Medium
        } else {
            SecurityLevel::Low
        }
    }
}

/// Security assessment for one facility
///
/// Can also be supplied directly (e.g. from a field report) with only the
/// level set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAssessment {
    pub security_level: SecurityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictSummary>,
}

/// Severity of the incident count inside one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ZoneSeverity {
    fn from_count(count: usize) -> ZoneSeverity {
        match count {
            0 => ZoneSeverity::None,
            1..=4 => ZoneSeverity::Low,
            5..=14 => ZoneSeverity::Medium,
            15..=29 => ZoneSeverity::High,
            _ => ZoneSeverity::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneSeverity::None => "NONE",
            ZoneSeverity::Low => "LOW",
            ZoneSeverity::Medium => "MEDIUM",
            ZoneSeverity::High => "HIGH",
            ZoneSeverity::Critical => "CRITICAL",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            ZoneSeverity::Critical => "🔴",
            ZoneSeverity::High => "🟠",
            ZoneSeverity::Medium => "🟡",
            _ => "🟢",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCount {
    pub zone: String,
    pub count: usize,
    pub severity: ZoneSeverity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorCount {
    pub actor: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosestIncident {
    pub distance_km: f64,
    pub event_type: String,
    pub event_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Aggregated incident picture around a facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub risk_score: u32,
    pub window_days: u32,
    pub incidents_nearby: usize,
    pub incidents_by_zone: Vec<ZoneCount>,
    pub incidents_by_type: BTreeMap<String, usize>,
    pub total_fatalities: u32,
    pub top_actors: Vec<ActorCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_incident: Option<ClosestIncident>,
}

/// Settings for the conflict assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictSettings {
    /// Incidents older than this many days before `as_of` are ignored
    pub window_days: u32,
}

impl Default for ConflictSettings {
    fn default() -> Self {
        ConflictSettings { window_days: 60 }
    }
}

struct DistanceZone {
    label: &'static str,
    min_km: f64,
    max_km: f64,
    weight: f64,
}

const DISTANCE_ZONES: &[DistanceZone] = &[
    DistanceZone {
        label: "0-10 km",
        min_km: 0.0,
        max_km: 10.0,
        weight: 5.0,
    },
    DistanceZone {
        label: "10-25 km",
        min_km: 10.0,
        max_km: 25.0,
        weight: 3.0,
    },
    DistanceZone {
        label: "25-50 km",
        min_km: 25.0,
        max_km: 50.0,
        weight: 2.0,
    },
    DistanceZone {
        label: "50-100 km",
        min_km: 50.0,
        max_km: 100.0,
        weight: 1.0,
    },
];

const FATALITY_WEIGHT: f64 = 0.5;
const TOP_ACTORS: usize = 5;

/// Assess the security situation around a facility
pub fn assess_security(
    facility: &Facility,
    events: &[ConflictEvent],
    as_of: NaiveDate,
    settings: &ConflictSettings,
) -> SecurityAssessment {
    if events.is_empty() {
        return SecurityAssessment {
            security_level: SecurityLevel::Unknown,
            assessment: None,
            facility_name: Some(facility.name.clone()),
            conflict: None,
        };
    }

    let cutoff = as_of - Duration::days(i64::from(settings.window_days));
    let origin = facility.location();

    let mut zone_counts = [0usize; 4];
    let mut nearby: Vec<(&ConflictEvent, f64)> = Vec::new();

    for event in events {
        if event.event_date < cutoff || !event.location_point().is_valid() {
            continue;
        }
        let distance = geo::haversine_km(origin, event.location_point());
        if let Some(idx) = DISTANCE_ZONES
            .iter()
            .position(|z| distance >= z.min_km && distance < z.max_km)
        {
            zone_counts[idx] += 1;
            nearby.push((event, distance));
        }
    }

    let mut incidents_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut actor_counts: HashMap<&str, usize> = HashMap::new();
    let mut total_fatalities: u32 = 0;
    for (event, _) in &nearby {
        *incidents_by_type.entry(event.event_type.clone()).or_insert(0) += 1;
        total_fatalities = total_fatalities.saturating_add(event.fatalities);
        if let Some(actor) = event.actor1.as_deref().filter(|a| !a.is_empty()) {
            *actor_counts.entry(actor).or_insert(0) += 1;
        }
    }

    let risk_score: f64 = DISTANCE_ZONES
        .iter()
        .zip(zone_counts.iter())
        .map(|(zone, count)| *count as f64 * zone.weight)
        .sum::<f64>()
        + f64::from(total_fatalities) * FATALITY_WEIGHT;
    let security_level = SecurityLevel::from_risk_score(risk_score);

    let mut top_actors: Vec<ActorCount> = actor_counts
        .into_iter()
        .map(|(actor, count)| ActorCount {
            actor: actor.to_string(),
            count,
        })
        .collect();
    top_actors.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.actor.cmp(&b.actor)));
    top_actors.truncate(TOP_ACTORS);

    let closest_incident = nearby
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(event, distance)| ClosestIncident {
            distance_km: (distance * 10.0).round() / 10.0,
            event_type: event.event_type.clone(),
            event_date: event.event_date,
            location: event.location.clone(),
        });

    let summary = ConflictSummary {
        risk_score: risk_score.round() as u32,
        window_days: settings.window_days,
        incidents_nearby: nearby.len(),
        incidents_by_zone: DISTANCE_ZONES
            .iter()
            .zip(zone_counts.iter())
            .map(|(zone, count)| ZoneCount {
                zone: zone.label.to_string(),
                count: *count,
                severity: ZoneSeverity::from_count(*count),
            })
            .collect(),
        incidents_by_type,
        total_fatalities,
        top_actors,
        closest_incident,
    };

    tracing::debug!(
        facility = %facility.name,
        incidents = summary.incidents_nearby,
        level = security_level.as_str(),
        "security assessment complete"
    );

    SecurityAssessment {
        security_level,
        assessment: Some(render_narrative(security_level, &summary)),
        facility_name: Some(facility.name.clone()),
        conflict: Some(summary),
    }
}

/// Markdown narrative for a conflict summary
fn render_narrative(level: SecurityLevel, summary: &ConflictSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Security Level: **{}**\n", level.as_str());
    let _ = writeln!(
        out,
        "### Conflict Data Summary (Last {} Days)\n",
        summary.window_days
    );
    let _ = writeln!(
        out,
        "**Total Security Incidents within 100km:** {}\n",
        summary.incidents_nearby
    );

    if summary.incidents_nearby == 0 {
        out.push_str(
            "✅ **No conflict events recorded in the vicinity.** This area shows no recent security incidents.\n\n",
        );
        out.push_str(
            "**Recommendation:** Proceed with standard security protocols. Monitor for emerging threats.\n",
        );
        return out;
    }

    out.push_str("**Proximity Analysis:**\n");
    for zone in summary.incidents_by_zone.iter().filter(|z| z.count > 0) {
        let _ = writeln!(
            out,
            "- {} {}: **{} incidents** ({} risk)",
            zone.severity.icon(),
            zone.zone,
            zone.count,
            zone.severity.as_str()
        );
    }
    let _ = writeln!(out, "\n**Total Fatalities:** {}\n", summary.total_fatalities);

    out.push_str("### Incident Types\n\n");
    let mut types: Vec<(&String, &usize)> = summary.incidents_by_type.iter().collect();
    types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (event_type, count) in types {
        let _ = writeln!(out, "- **{}**: {} incidents", event_type, count);
    }

    if !summary.top_actors.is_empty() {
        out.push_str("\n### Most Active Armed Groups/Actors\n\n");
        for actor in &summary.top_actors {
            let _ = writeln!(out, "- {}: {} incidents", actor.actor, actor.count);
        }
    }

    out
}
