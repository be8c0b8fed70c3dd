//! Integration tests over the JSON fixtures

use chrono::NaiveDate;
use hazardscope_core::config;
use hazardscope_core::district::{summarize_districts, District, DistrictDecision};
use hazardscope_core::report::render_statistics_text;
use hazardscope_core::security::{ConflictEvent, ConflictSettings};
use hazardscope_core::viability::assess_viability_with_thresholds;
use hazardscope_core::zone::ZoneKind;
use hazardscope_core::{
    analyze, analyze_with_config, assess_security, districts_with_config, load_json_array,
    render_json, Decision, Facility, HazardEvent, SecurityLevel,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_inputs() -> (Vec<Facility>, Vec<HazardEvent>) {
    let facilities = load_json_array(&fixture_path("facilities.json")).unwrap();
    let hazards = load_json_array(&fixture_path("hazards.json")).unwrap();
    (facilities, hazards)
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

#[test]
fn test_fixture_matching() {
    let (facilities, hazards) = load_inputs();
    let (result, _) = analyze(&facilities, &hazards);

    let names: Vec<&str> = result
        .impacted_facilities
        .iter()
        .map(|s| s.facility.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Kisumu Health Centre", "Bondo Clinic", "Mombasa Port Clinic"]
    );
    assert_eq!(result.skipped_facilities, 1, "Broken Row has no latitude");
    assert_eq!(result.skipped_hazards, 1, "wildfire has no latitude");

    let kisumu = result.impacts_for("Kisumu Health Centre");
    assert_eq!(kisumu.len(), 2);
    assert_eq!(kisumu[0].disaster.id, "fl-1001");
    assert_eq!(kisumu[1].disaster.id, "2002");
    assert!(result.impacts_for("Nairobi Depot").is_empty());
    assert_eq!(result.by_hazard["dr-4004"], Vec::<String>::new());
    assert_eq!(result.by_hazard["tc-3003"], vec!["Mombasa Port Clinic".to_string()]);
}

#[test]
fn test_fixture_statistics() {
    let (facilities, hazards) = load_inputs();
    let (_, stats) = analyze(&facilities, &hazards);

    assert_eq!(stats.total_facilities, 4, "Broken Row is not counted");
    assert_eq!(stats.total_hazards, 4, "wildfire has no usable center");
    assert_eq!(stats.impacted_facilities, 3);
    assert_eq!(stats.percentage_impacted, 75);
    assert_eq!(stats.alert_levels.red, 1);
    assert_eq!(stats.alert_levels.orange, 1);
    assert_eq!(stats.alert_levels.green, 1);

    let order: Vec<&str> = stats.hazards.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(order, vec!["2002", "fl-1001", "tc-3003", "dr-4004"]);
    assert_eq!(stats.hazards[2].zone_kind, ZoneKind::Polygon);
    assert_eq!(stats.hazards[0].zone_kind, ZoneKind::Circle);

    assert_eq!(stats.overlaps.len(), 1);
    assert_eq!(
        stats.overlaps[0].disasters,
        [
            "Flood in Kisumu County".to_string(),
            "Red earthquake alert (Magnitude 6.0M, Depth:10km) in Kenya".to_string()
        ]
    );
    assert_eq!(
        stats.overlaps[0].facilities,
        vec!["Kisumu Health Centre".to_string(), "Bondo Clinic".to_string()]
    );

    let text = render_statistics_text(&stats);
    assert!(text.contains("4 total, 3 impacted (75%)"));
    assert!(text.contains("Overlapping hazards:"));
}

#[test]
fn test_fixture_output_is_deterministic() {
    let (facilities, hazards) = load_inputs();
    let (first_match, first_stats) = analyze(&facilities, &hazards);
    let (second_match, second_stats) = analyze(&facilities, &hazards);

    assert_eq!(render_json(&first_match), render_json(&second_match));
    assert_eq!(render_json(&first_stats), render_json(&second_stats));
}

#[test]
fn test_fixture_security_from_conflicts() {
    let (facilities, _) = load_inputs();
    let events: Vec<ConflictEvent> = load_json_array(&fixture_path("conflicts.json")).unwrap();

    let kisumu = &facilities[0];
    let security = assess_security(kisumu, &events, as_of(), &ConflictSettings::default());
    assert_eq!(security.security_level, SecurityLevel::Medium);

    let summary = security.conflict.as_ref().unwrap();
    assert_eq!(summary.incidents_nearby, 4, "January battle is outside the window");
    assert_eq!(summary.total_fatalities, 12);
    assert_eq!(summary.risk_score, 26);
    assert_eq!(summary.top_actors[0].actor, "Protesters (Kenya)");
    assert_eq!(summary.incidents_by_type["Riots"], 2);

    let wide = ConflictSettings { window_days: 365 };
    let security = assess_security(kisumu, &events, as_of(), &wide);
    assert_eq!(security.security_level, SecurityLevel::High);

    let remote = &facilities[2];
    let security = assess_security(remote, &events, as_of(), &ConflictSettings::default());
    assert_eq!(security.security_level, SecurityLevel::Low);
}

#[test]
fn test_fixture_assessment_with_security() {
    let (facilities, hazards) = load_inputs();
    let events: Vec<ConflictEvent> = load_json_array(&fixture_path("conflicts.json")).unwrap();
    let (result, _) = analyze(&facilities, &hazards);

    let kisumu = &facilities[0];
    let security = assess_security(kisumu, &events, as_of(), &ConflictSettings::default());
    let thresholds = Default::default();

    let without = assess_viability_with_thresholds(
        kisumu,
        result.impacts_for(&kisumu.name),
        None,
        &thresholds,
    );
    let with = assess_viability_with_thresholds(
        kisumu,
        result.impacts_for(&kisumu.name),
        Some(&security),
        &thresholds,
    );

    assert!(with.viability_score <= without.viability_score);
    assert_eq!(with.security_assessment.as_ref(), Some(&security));
    assert!(matches!(
        with.decision,
        Decision::DelayRecommended | Decision::DoNotProceed
    ));
}

#[test]
fn test_fixture_districts() {
    let (facilities, hazards) = load_inputs();
    let districts: Vec<District> = load_json_array(&fixture_path("districts.json")).unwrap();
    let (result, _) = analyze(&facilities, &hazards);

    let summaries =
        summarize_districts(&districts, &facilities, &result.impacted_facilities, &hazards);
    let names: Vec<&str> = summaries.iter().map(|d| d.district.as_str()).collect();
    assert_eq!(names, vec!["Kisumu", "Siaya", "Nairobi"], "Turkana has no facilities");

    let kisumu = &summaries[0];
    assert_eq!(kisumu.impact_rate, 100);
    assert_eq!(kisumu.disaster_count, 2);
    assert_eq!(kisumu.decision, DistrictDecision::Delay);

    let nairobi = &summaries[2];
    assert_eq!(nairobi.impacted_facilities, 0);
    assert_eq!(nairobi.decision, DistrictDecision::Go);
    assert_eq!(nairobi.viability_score, 100);
}

#[test]
fn test_district_counts_follow_hazard_filter() {
    let (facilities, hazards) = load_inputs();
    let districts: Vec<District> = load_json_array(&fixture_path("districts.json")).unwrap();
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join(".hazardscoperc.json"),
        r#"{ "filter": { "event_types": ["tc"] } }"#,
    )
    .unwrap();
    let resolved = config::load_and_resolve(temp.path(), None).unwrap();

    let (result, summaries) = districts_with_config(&districts, &facilities, &hazards, &resolved);
    assert_eq!(result.by_hazard.len(), 1, "only the cyclone is visible");

    // Flood and earthquake centers sit inside Kisumu but are filtered out
    let kisumu = summaries.iter().find(|d| d.district == "Kisumu").unwrap();
    assert_eq!(kisumu.disaster_count, 0);
    assert_eq!(kisumu.impacted_facilities, 0);
    assert_eq!(kisumu.decision, DistrictDecision::Go);
    assert_eq!(kisumu.viability_score, 100);
}

#[test]
fn test_config_filter_and_radii() {
    let (facilities, hazards) = load_inputs();
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join(".hazardscoperc.json"),
        r#"{
            "radii": { "fl": 10 },
            "filter": { "event_types": ["fl", "tc"] }
        }"#,
    )
    .unwrap();

    let resolved = config::load_and_resolve(temp.path(), None).unwrap();
    assert!(resolved.config_path.is_some());

    let (result, stats) = analyze_with_config(&facilities, &hazards, &resolved);
    assert_eq!(stats.total_hazards, 2, "earthquake, drought and wildfire filtered out");

    // 10 km flood circle no longer reaches Bondo
    let names: Vec<&str> = result
        .impacted_facilities
        .iter()
        .map(|s| s.facility.name.as_str())
        .collect();
    assert_eq!(names, vec!["Kisumu Health Centre", "Mombasa Port Clinic"]);
    assert!(stats.overlaps.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("hazardscope.config.json"),
        r#"{ "thresholds": { "go": 30, "caution": 40, "delay": 20 } }"#,
    )
    .unwrap();

    let err = config::load_and_resolve(temp.path(), None).unwrap_err();
    assert!(format!("{:#}", err).contains("hazardscope.config.json"));
}
