//! Single-session snapshot holder
//!
//! Inputs are replaced wholesale and every replacement bumps a generation
//! counter. Reports carry the generation they were computed from, so a
//! caller recomputing in the background can drop results that went stale
//! while they were running (last write wins).

use crate::matcher::{match_impacts_with_radii, MatchResult};
use crate::model::{Facility, HazardEvent};
use crate::stats::{aggregate_statistics_with_radii, Statistics};
use crate::zone::ImpactRadii;
use serde::Serialize;
use std::sync::Arc;

/// Immutable (facilities, hazards) pair
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub facilities: Arc<Vec<Facility>>,
    pub hazards: Arc<Vec<HazardEvent>>,
    pub generation: u64,
}

/// Matching and statistics computed from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub generation: u64,
    pub matches: MatchResult,
    pub statistics: Statistics,
}

/// Compute a report for a snapshot
pub fn compute_report(snapshot: &Snapshot, radii: &ImpactRadii) -> ImpactReport {
    let matches = match_impacts_with_radii(&snapshot.facilities, &snapshot.hazards, radii);
    let statistics = aggregate_statistics_with_radii(
        &snapshot.facilities,
        &snapshot.hazards,
        &matches.impacted_facilities,
        radii,
    );
    ImpactReport {
        generation: snapshot.generation,
        matches,
        statistics,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Snapshot,
    radii: ImpactRadii,
}

impl Session {
    pub fn new(radii: ImpactRadii) -> Self {
        Session {
            current: Snapshot::default(),
            radii,
        }
    }

    pub fn generation(&self) -> u64 {
        self.current.generation
    }

    /// Cheap clone of the current inputs for off-thread computation
    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    pub fn radii(&self) -> &ImpactRadii {
        &self.radii
    }

    pub fn replace_facilities(&mut self, facilities: Vec<Facility>) -> u64 {
        self.current.facilities = Arc::new(facilities);
        self.bump()
    }

    pub fn replace_hazards(&mut self, hazards: Vec<HazardEvent>) -> u64 {
        self.current.hazards = Arc::new(hazards);
        self.bump()
    }

    /// Swap both inputs in one step
    pub fn replace_all(&mut self, facilities: Vec<Facility>, hazards: Vec<HazardEvent>) -> u64 {
        self.current.facilities = Arc::new(facilities);
        self.current.hazards = Arc::new(hazards);
        self.bump()
    }

    pub fn set_radii(&mut self, radii: ImpactRadii) -> u64 {
        self.radii = radii;
        self.bump()
    }

    fn bump(&mut self) -> u64 {
        self.current.generation += 1;
        self.current.generation
    }

    pub fn is_current(&self, report: &ImpactReport) -> bool {
        report.generation == self.current.generation
    }

    /// Recompute synchronously from the current snapshot
    pub fn recompute(&self) -> ImpactReport {
        compute_report(&self.current, &self.radii)
    }

    /// Keep a report only if no replacement happened since it was started
    pub fn accept(&self, report: ImpactReport) -> Option<ImpactReport> {
        if self.is_current(&report) {
            Some(report)
        } else {
            tracing::debug!(
                stale = report.generation,
                current = self.current.generation,
                "discarding stale impact report"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;

    #[test]
    fn test_generation_bumps_on_every_replacement() {
        let mut session = Session::default();
        assert_eq!(session.generation(), 0);
        assert_eq!(session.replace_facilities(vec![]), 1);
        assert_eq!(session.replace_hazards(vec![]), 2);
        assert_eq!(session.replace_all(vec![], vec![]), 3);
    }

    #[test]
    fn test_stale_report_discarded() {
        let mut session = Session::default();
        session.replace_all(
            vec![Facility::new("Clinic", 0.0, 0.0)],
            vec![HazardEvent::new("f1", EventType::Flood, 0.0, 0.0)],
        );

        let snapshot = session.snapshot();
        let in_flight = compute_report(&snapshot, session.radii());
        assert_eq!(in_flight.matches.impacted_facilities.len(), 1);

        // Hazard refresh lands while the report was computing
        session.replace_hazards(vec![]);
        assert!(session.accept(in_flight).is_none());

        let fresh = session.recompute();
        assert!(fresh.matches.impacted_facilities.is_empty());
        assert!(session.accept(fresh).is_some());
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let mut session = Session::default();
        session.replace_facilities(vec![Facility::new("A", 1.0, 1.0)]);
        let before = session.snapshot();
        session.replace_facilities(vec![]);
        assert_eq!(before.facilities.len(), 1);
        assert_eq!(session.snapshot().facilities.len(), 0);
    }
}
