//! Hazard filtering and alert-level rollups
//!
//! The dashboard's toggles become one explicit filter value.

use crate::model::{AlertLevel, EventType, HazardEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Which hazards to keep
///
/// Every empty set allows all values. CAP values are compared after
/// [`normalize_cap`], so `"Severe"` and `"severe"` are the same entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardFilter {
    pub event_types: BTreeSet<EventType>,
    pub severities: BTreeSet<String>,
    pub certainties: BTreeSet<String>,
    pub urgencies: BTreeSet<String>,
    pub alert_levels: BTreeSet<AlertLevel>,
    /// Timeline cutoff: keep only hazards published at or before this instant
    pub published_before: Option<DateTime<Utc>>,
}

impl HazardFilter {
    pub fn allow_all() -> Self {
        HazardFilter::default()
    }

    pub fn with_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types.extend(types);
        self
    }

    pub fn with_alert_levels(mut self, levels: impl IntoIterator<Item = AlertLevel>) -> Self {
        self.alert_levels.extend(levels);
        self
    }

    pub fn with_severities<S: AsRef<str>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.severities
            .extend(values.into_iter().map(|v| normalize_cap(Some(v.as_ref()))));
        self
    }

    pub fn with_certainties<S: AsRef<str>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.certainties
            .extend(values.into_iter().map(|v| normalize_cap(Some(v.as_ref()))));
        self
    }

    pub fn with_urgencies<S: AsRef<str>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.urgencies
            .extend(values.into_iter().map(|v| normalize_cap(Some(v.as_ref()))));
        self
    }

    pub fn published_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.published_before = Some(cutoff);
        self
    }

    pub fn matches(&self, hazard: &HazardEvent) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&hazard.event_type) {
            return false;
        }

        if !self.alert_levels.is_empty() {
            match hazard.alert_level {
                Some(level) if self.alert_levels.contains(&level) => {}
                _ => return false,
            }
        }

        let cap_checks = [
            (&self.severities, hazard.severity.as_deref()),
            (&self.certainties, hazard.certainty.as_deref()),
            (&self.urgencies, hazard.urgency.as_deref()),
        ];
        for (allowed, value) in cap_checks {
            if !allowed.is_empty() && !allowed.contains(&normalize_cap(value)) {
                return false;
            }
        }

        if let Some(cutoff) = self.published_before {
            match hazard.pub_date {
                Some(published) if published <= cutoff => {}
                _ => return false,
            }
        }

        true
    }
}

/// Lowercased, trimmed CAP value; missing or blank becomes `"unknown"`
pub fn normalize_cap(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => "unknown".to_string(),
    }
}

/// Hazards passing the filter, in input order
pub fn filter_hazards(hazards: &[HazardEvent], filter: &HazardFilter) -> Vec<HazardEvent> {
    hazards
        .iter()
        .filter(|h| filter.matches(h))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertLevelCounts {
    pub red: usize,
    pub orange: usize,
    pub green: usize,
}

/// Bucket hazards by alert level, using CAP severity when the level is missing
///
/// Hazards with neither are not counted.
pub fn alert_level_counts<'a>(
    hazards: impl IntoIterator<Item = &'a HazardEvent>,
) -> AlertLevelCounts {
    let mut counts = AlertLevelCounts::default();
    for hazard in hazards {
        let key = match hazard.alert_level {
            Some(level) => level.as_str().to_string(),
            None => normalize_cap(hazard.severity.as_deref()),
        };
        match key.as_str() {
            "red" | "extreme" | "severe" => counts.red += 1,
            "orange" | "moderate" => counts.orange += 1,
            "green" | "minor" => counts.green += 1,
            _ => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hazard(id: &str, event_type: EventType) -> HazardEvent {
        HazardEvent::new(id, event_type, 0.0, 0.0)
    }

    fn ids(hazards: &[HazardEvent]) -> Vec<&str> {
        hazards.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let hazards = vec![hazard("a", EventType::Flood), hazard("b", EventType::Unknown)];
        assert_eq!(filter_hazards(&hazards, &HazardFilter::allow_all()).len(), 2);
    }

    #[test]
    fn test_event_type_and_alert_filters() {
        let hazards = vec![
            hazard("a", EventType::Flood).with_alert(AlertLevel::Red),
            hazard("b", EventType::Earthquake).with_alert(AlertLevel::Red),
            hazard("c", EventType::Flood).with_alert(AlertLevel::Green),
            hazard("d", EventType::Flood),
        ];
        let filter = HazardFilter::allow_all()
            .with_event_types([EventType::Flood])
            .with_alert_levels([AlertLevel::Red, AlertLevel::Orange]);
        assert_eq!(ids(&filter_hazards(&hazards, &filter)), vec!["a"]);
    }

    #[test]
    fn test_cap_filters_are_case_insensitive() {
        let mut severe = hazard("a", EventType::Flood);
        severe.severity = Some("Severe".to_string());
        let mut minor = hazard("b", EventType::Flood);
        minor.severity = Some("minor".to_string());
        let missing = hazard("c", EventType::Flood);

        let filter = HazardFilter::allow_all().with_severities(["SEVERE", "Unknown"]);
        assert_eq!(
            ids(&filter_hazards(&[severe, minor, missing], &filter)),
            vec!["a", "c"]
        );
    }

    #[test]
    fn test_timeline_cutoff() {
        let early = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let hazards = vec![
            hazard("early", EventType::Flood).with_pub_date(early),
            hazard("late", EventType::Flood).with_pub_date(late),
            hazard("undated", EventType::Flood),
        ];
        let filter = HazardFilter::allow_all().published_before(early);
        assert_eq!(ids(&filter_hazards(&hazards, &filter)), vec!["early"]);
    }

    #[test]
    fn test_alert_level_counts_fall_back_to_severity() {
        let mut extreme = hazard("a", EventType::Flood);
        extreme.severity = Some("Extreme".to_string());
        let mut moderate = hazard("b", EventType::Flood);
        moderate.severity = Some("Moderate".to_string());
        let hazards = vec![
            hazard("c", EventType::Flood).with_alert(AlertLevel::Red),
            hazard("d", EventType::Flood).with_alert(AlertLevel::Green),
            extreme,
            moderate,
            hazard("e", EventType::Flood),
        ];
        assert_eq!(
            alert_level_counts(&hazards),
            AlertLevelCounts {
                red: 2,
                orange: 1,
                green: 1
            }
        );
    }
}
