//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::district::DistrictSummary;
use crate::matcher::FacilityImpactSummary;
use crate::stats::Statistics;
use crate::viability::ViabilityAssessment;
use serde::Serialize;
use std::fmt::Write;

/// Sort assessments deterministically: most at risk first
pub fn sort_assessments(mut assessments: Vec<ViabilityAssessment>) -> Vec<ViabilityAssessment> {
    assessments.sort_by(|a, b| {
        // 1. Score ascending
        a.viability_score
            .cmp(&b.viability_score)
            // 2. Facility name ascending
            .then_with(|| a.facility_name.cmp(&b.facility_name))
    });
    assessments
}

/// Render impacted facilities as text output
pub fn render_text(impacted: &[FacilityImpactSummary]) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{:<24} {:<28} {:<6} {:<8} {:>10}",
        "FACILITY", "HAZARD", "TYPE", "ALERT", "DIST_KM"
    );

    for summary in impacted {
        for impact in &summary.impacts {
            let _ = writeln!(
                output,
                "{:<24} {:<28} {:<6} {:<8} {:>10.2}",
                truncate_or_pad(&summary.facility.name, 24),
                truncate_or_pad(impact.disaster.display_name(), 28),
                impact.disaster.event_type.code(),
                impact.disaster.alert_level.map(|l| l.as_str()).unwrap_or("-"),
                impact.distance_km,
            );
        }
    }

    let _ = writeln!(output, "\n{} facilities impacted", impacted.len());
    output
}

/// Render viability assessments as text output
pub fn render_assessments_text(assessments: &[ViabilityAssessment]) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{:<6} {:<22} {:<10} {:<6} {}",
        "SCORE", "DECISION", "WAIT", "RISKS", "FACILITY"
    );
    for a in assessments {
        let _ = writeln!(
            output,
            "{:<6} {:<22} {:<10} {:<6} {}",
            a.viability_score,
            a.decision.as_str(),
            a.timeline.wait_time,
            a.risks.len(),
            a.facility_name,
        );
    }

    output
}

/// Render the statistics rollup as text output
pub fn render_statistics_text(stats: &Statistics) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Facilities: {} total, {} impacted ({}%)",
        stats.total_facilities, stats.impacted_facilities, stats.percentage_impacted
    );
    let _ = writeln!(
        output,
        "Hazards: {} total (red {}, orange {}, green {})",
        stats.total_hazards,
        stats.alert_levels.red,
        stats.alert_levels.orange,
        stats.alert_levels.green
    );

    if !stats.hazards.is_empty() {
        let _ = writeln!(
            output,
            "\n{:<28} {:<6} {:<8} {:>9} {:>12}",
            "HAZARD", "TYPE", "ZONE", "AFFECTED", "AREA_KM2"
        );
        for h in &stats.hazards {
            let _ = writeln!(
                output,
                "{:<28} {:<6} {:<8} {:>9} {:>12.0}",
                truncate_or_pad(&h.name, 28),
                h.event_type.code(),
                h.zone_kind.as_str(),
                h.affected_facilities,
                h.impact_area_km2,
            );
        }
    }

    if !stats.overlaps.is_empty() {
        output.push_str("\nOverlapping hazards:\n");
        for overlap in &stats.overlaps {
            let _ = writeln!(
                output,
                "  {} + {}: {}",
                overlap.disasters[0],
                overlap.disasters[1],
                overlap.facilities.join(", ")
            );
        }
    }

    output
}

/// Render district summaries as text output
pub fn render_districts_text(districts: &[DistrictSummary]) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{:<24} {:>6} {:>9} {:>6} {:>9} {:<8} {:>6}",
        "DISTRICT", "TOTAL", "IMPACTED", "RATE", "HAZARDS", "DECISION", "SCORE"
    );
    for d in districts {
        let _ = writeln!(
            output,
            "{:<24} {:>6} {:>9} {:>5}% {:>9} {:<8} {:>6}",
            truncate_or_pad(&d.district, 24),
            d.total_facilities,
            d.impacted_facilities,
            d.impact_rate,
            d.disaster_count,
            d.decision.as_str(),
            d.viability_score,
        );
    }

    output
}

/// Render any report value as JSON output
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// Markdown brief for one assessment (used when no generated text is available)
pub fn render_brief(facility_name: &str, assessment: &ViabilityAssessment) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## Campaign Viability Assessment: {}\n", facility_name);
    let _ = writeln!(out, "**Decision**: {}", assessment.decision);
    let _ = writeln!(out, "**Viability Score**: {}/100\n", assessment.viability_score);

    out.push_str("### Timeline\n");
    let _ = writeln!(out, "- {}", assessment.timeline.recommendation);
    let _ = writeln!(out, "- Wait time: {}", assessment.timeline.wait_time);
    let _ = writeln!(out, "- Rationale: {}\n", assessment.timeline.rationale);

    if !assessment.risks.is_empty() {
        out.push_str("### Risks\n");
        for risk in &assessment.risks {
            let _ = writeln!(
                out,
                "- {} **{}** ({}): {}",
                risk.icon,
                risk.factor,
                risk.severity.as_str(),
                risk.detail
            );
        }
        out.push('\n');
    }

    if !assessment.mitigation_strategies.is_empty() {
        out.push_str("### Mitigation Strategies\n");
        for m in &assessment.mitigation_strategies {
            let _ = writeln!(out, "**{}**", m.risk);
            let _ = writeln!(out, "- {}\n", m.strategy);
        }
    }

    out
}

/// Truncate or pad string to fixed width (in characters)
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
