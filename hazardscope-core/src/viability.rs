//! Campaign viability scoring
//!
//! Turns one facility's impacts (plus an optional security assessment) into a
//! 0-100 score, a GO/NO-GO decision, ranked risks and a recommended wait.
//!
//! Global invariants enforced:
//! - Pure function of its inputs (no clocks, no randomness)
//! - Penalties are additive and non-negative; the score is clamped once
//! - Per-impact rules stack per hazard; facility-wide rules fire at most once
//! - The decision is derived from the final, post-security score

use crate::matcher::Impact;
use crate::model::{AlertLevel, EventType, Facility};
use crate::security::{SecurityAssessment, SecurityLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk severity (ordered from least to most severe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskSeverity::Low => "LOW",
            RiskSeverity::Medium => "MEDIUM",
            RiskSeverity::High => "HIGH",
            RiskSeverity::Critical => "CRITICAL",
        }
    }
}

/// Campaign decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "PROCEED WITH CAUTION")]
    ProceedWithCaution,
    #[serde(rename = "DELAY RECOMMENDED")]
    DelayRecommended,
    #[serde(rename = "DO NOT PROCEED")]
    DoNotProceed,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Go => "GO",
            Decision::ProceedWithCaution => "PROCEED WITH CAUTION",
            Decision::DelayRecommended => "DELAY RECOMMENDED",
            Decision::DoNotProceed => "DO NOT PROCEED",
        }
    }

    pub fn timeline(&self) -> Timeline {
        let (recommendation, wait_time, rationale) = match self {
            Decision::Go => (
                "Proceed immediately",
                "0 days",
                "Conditions are favorable for campaign execution",
            ),
            Decision::ProceedWithCaution => (
                "Proceed with enhanced precautions",
                "3-7 days",
                "Wait for initial situation to stabilize. Reassess conditions in 3 days.",
            ),
            Decision::DelayRecommended => (
                "Delay campaign",
                "2-3 weeks",
                "Significant risks present. Wait for disaster impacts to subside and conditions to improve.",
            ),
            Decision::DoNotProceed => (
                "Postpone campaign",
                "1-2 months",
                "Severe risks make campaign unsafe or ineffective. Major recovery needed before proceeding.",
            ),
        };
        Timeline {
            recommendation: recommendation.to_string(),
            wait_time: wait_time.to_string(),
            rationale: rationale.to_string(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One itemized risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub factor: String,
    pub severity: RiskSeverity,
    pub detail: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disaster_type: Option<EventType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationStrategy {
    pub risk: String,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub recommendation: String,
    pub wait_time: String,
    pub rationale: String,
}

/// Full viability assessment for one facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViabilityAssessment {
    pub viability_score: u8,
    pub decision: Decision,
    pub risks: Vec<RiskFactor>,
    pub mitigation_strategies: Vec<MitigationStrategy>,
    pub timeline: Timeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_assessment: Option<SecurityAssessment>,
    pub facility_name: String,
}

/// Score thresholds for each decision (inclusive lower bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionThresholds {
    pub go: u8,
    pub caution: u8,
    pub delay: u8,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        DecisionThresholds {
            go: 70,
            caution: 40,
            delay: 20,
        }
    }
}

pub fn decision_for_score(score: u8, thresholds: &DecisionThresholds) -> Decision {
    if score >= thresholds.go {
        Decision::Go
    } else if score >= thresholds.caution {
        Decision::ProceedWithCaution
    } else if score >= thresholds.delay {
        Decision::DelayRecommended
    } else {
        Decision::DoNotProceed
    }
}

// Rule tables

struct ProximityBand {
    below_km: f64,
    penalty: i32,
    severity: RiskSeverity,
    icon: &'static str,
    qualifier: &'static str,
    outlook: &'static str,
    /// `{hazard}` is replaced by the hazard name
    strategy: Option<&'static str>,
}

impl ProximityBand {
    fn detail(&self, hazard: &str, km: f64) -> String {
        format!("{} {}{}km away{}", hazard, self.qualifier, km, self.outlook)
    }
}

const PROXIMITY_BANDS: &[ProximityBand] = &[
    ProximityBand {
        below_km: 10.0,
        penalty: 40,
        severity: RiskSeverity::Critical,
        icon: "🔴",
        qualifier: "only ",
        outlook: "",
        strategy: Some(
            "Postpone campaign until {hazard} threat subsides. Monitor situation daily.",
        ),
    },
    ProximityBand {
        below_km: 50.0,
        penalty: 20,
        severity: RiskSeverity::High,
        icon: "🟠",
        qualifier: "",
        outlook: " - may impact operations",
        strategy: Some(
            "Proceed with caution. Have evacuation plan ready and monitor disaster progression.",
        ),
    },
    ProximityBand {
        below_km: 100.0,
        penalty: 10,
        severity: RiskSeverity::Medium,
        icon: "🟡",
        qualifier: "",
        outlook: " - monitor closely",
        strategy: None,
    },
];

struct AlertRule {
    level: AlertLevel,
    penalty: i32,
    factor: &'static str,
    severity: RiskSeverity,
    icon: &'static str,
    outlook: &'static str,
}

const ALERT_RULES: &[AlertRule] = &[
    AlertRule {
        level: AlertLevel::Red,
        penalty: 25,
        factor: "High Alert Level",
        severity: RiskSeverity::Critical,
        icon: "🔴",
        outlook: "severe conditions",
    },
    AlertRule {
        level: AlertLevel::Orange,
        penalty: 15,
        factor: "Elevated Alert Level",
        severity: RiskSeverity::High,
        icon: "🟠",
        outlook: "heightened risk",
    },
];

struct RiskEntry {
    factor: &'static str,
    severity: RiskSeverity,
    detail: &'static str,
    icon: &'static str,
}

/// Informational risks per hazard type (no score impact)
struct HazardAdvisory {
    event_type: EventType,
    risks: &'static [RiskEntry],
    mitigation: (&'static str, &'static str),
}

const HAZARD_ADVISORIES: &[HazardAdvisory] = &[
    HazardAdvisory {
        event_type: EventType::Flood,
        risks: &[
            RiskEntry {
                factor: "Waterborne Disease Risk",
                severity: RiskSeverity::High,
                detail: "Post-flood conditions create mosquito breeding sites - expect 40-60% increase in malaria cases",
                icon: "🦟",
            },
            RiskEntry {
                factor: "Water Contamination",
                severity: RiskSeverity::High,
                detail: "Contaminated water sources increase diarrheal disease risk",
                icon: "💧",
            },
        ],
        mitigation: (
            "Waterborne Disease Risk",
            "Increase ACT/RDT stock by 50%. Coordinate with WASH team for vector control. Consider prophylaxis for high-risk populations.",
        ),
    },
    HazardAdvisory {
        event_type: EventType::TropicalCyclone,
        risks: &[RiskEntry {
            factor: "Infrastructure Damage",
            severity: RiskSeverity::Critical,
            detail: "Cyclones typically damage health facilities, roads, and communication networks",
            icon: "🌀",
        }],
        mitigation: (
            "Infrastructure Damage",
            "Conduct facility assessment before campaign. Use mobile teams if fixed sites damaged. Bring backup communication equipment.",
        ),
    },
    HazardAdvisory {
        event_type: EventType::Earthquake,
        risks: &[
            RiskEntry {
                factor: "Structural Safety",
                severity: RiskSeverity::Critical,
                detail: "Buildings may be unsafe. Aftershocks possible.",
                icon: "🏚️",
            },
            RiskEntry {
                factor: "Healthcare System Strain",
                severity: RiskSeverity::High,
                detail: "Local health system overwhelmed with trauma cases",
                icon: "🏥",
            },
        ],
        mitigation: (
            "Structural Safety",
            "Conduct building safety assessment. Use outdoor vaccination posts or temporary structures. Have earthquake evacuation plan.",
        ),
    },
    HazardAdvisory {
        event_type: EventType::Drought,
        risks: &[
            RiskEntry {
                factor: "Malnutrition Risk",
                severity: RiskSeverity::High,
                detail: "Drought conditions lead to malnutrition, reducing vaccine efficacy",
                icon: "🌾",
            },
            RiskEntry {
                factor: "Population Migration",
                severity: RiskSeverity::Medium,
                detail: "Communities may migrate in search of water/food",
                icon: "👥",
            },
        ],
        mitigation: (
            "Malnutrition Risk",
            "Integrate vitamin A supplementation and nutrition screening. Partner with food security programs.",
        ),
    },
    HazardAdvisory {
        event_type: EventType::Volcano,
        risks: &[RiskEntry {
            factor: "Air Quality Hazard",
            severity: RiskSeverity::High,
            detail: "Volcanic ash causes respiratory issues - complicates vaccination",
            icon: "🌋",
        }],
        mitigation: (
            "Air Quality Hazard",
            "Provide N95 masks for staff and community. Monitor air quality. Consider indoor-only activities.",
        ),
    },
    HazardAdvisory {
        event_type: EventType::Wildfire,
        risks: &[RiskEntry {
            factor: "Air Quality & Smoke",
            severity: RiskSeverity::High,
            detail: "Smoke inhalation risk, especially for children and vulnerable populations",
            icon: "🔥",
        }],
        mitigation: (
            "Air Quality & Smoke",
            "Monitor air quality index. Postpone if AQI > 150. Provide masks and indoor venues.",
        ),
    },
];

/// Facility-wide rule: fires once if any impact matches
struct SystemicRule {
    hazard_types: &'static [EventType],
    below_km: f64,
    penalty: i32,
    risk: RiskEntry,
    strategy: &'static str,
}

const SYSTEMIC_RULES: &[SystemicRule] = &[
    SystemicRule {
        hazard_types: &[
            EventType::Earthquake,
            EventType::TropicalCyclone,
            EventType::Flood,
        ],
        below_km: 50.0,
        penalty: 35,
        risk: RiskEntry {
            factor: "Cold Chain Compromise",
            severity: RiskSeverity::Critical,
            detail: "Power outage risk threatens vaccine storage. Potency loss possible within 24-48 hours.",
            icon: "❄️",
        },
        strategy: "Pre-position vaccines at unaffected facility. Bring ice packs and vaccine carriers. Check generator fuel. Have cold chain monitor devices.",
    },
    SystemicRule {
        hazard_types: &[
            EventType::Flood,
            EventType::Earthquake,
            EventType::TropicalCyclone,
        ],
        below_km: 30.0,
        penalty: 30,
        risk: RiskEntry {
            factor: "Access Constraints",
            severity: RiskSeverity::High,
            detail: "Roads may be impassable due to flooding, debris, or structural damage",
            icon: "🚧",
        },
        strategy: "Scout alternative routes. Use 4x4 vehicles or motorcycles. Consider postponing until roads cleared. Deploy mobile teams if facility unreachable.",
    },
    SystemicRule {
        hazard_types: &[
            EventType::Flood,
            EventType::TropicalCyclone,
            EventType::Earthquake,
            EventType::Volcano,
        ],
        below_km: 20.0,
        penalty: 25,
        risk: RiskEntry {
            factor: "Population Displacement",
            severity: RiskSeverity::High,
            detail: "~35% of target population may have fled to safer areas or IDP camps",
            icon: "🏕️",
        },
        strategy: "Deploy mobile teams to IDP camps and displacement sites. Coordinate with camp managers. Adjust target numbers. Track population movements.",
    },
    SystemicRule {
        hazard_types: &[
            EventType::Earthquake,
            EventType::Volcano,
            EventType::TropicalCyclone,
        ],
        below_km: 50.0,
        penalty: 20,
        risk: RiskEntry {
            factor: "Staff Safety Concerns",
            severity: RiskSeverity::Medium,
            detail: "Aftershocks, ongoing hazards, or unstable conditions pose risks to campaign teams",
            icon: "⚠️",
        },
        strategy: "Provide safety briefing and PPE. Establish check-in protocols (hourly). Have evacuation plan. Ensure teams have communication equipment. Consider hazard pay.",
    },
];

struct SecurityRule {
    level: SecurityLevel,
    penalty: i32,
    risk: RiskEntry,
}

const SECURITY_RULES: &[SecurityRule] = &[
    SecurityRule {
        level: SecurityLevel::Critical,
        penalty: 40,
        risk: RiskEntry {
            factor: "Critical Security Risk",
            severity: RiskSeverity::Critical,
            detail: "Area assessed as critical security risk - campaign operations may be unsafe",
            icon: "🚨",
        },
    },
    SecurityRule {
        level: SecurityLevel::High,
        penalty: 25,
        risk: RiskEntry {
            factor: "High Security Risk",
            severity: RiskSeverity::High,
            detail: "Elevated security concerns requiring enhanced protocols",
            icon: "⚠️",
        },
    },
    SecurityRule {
        level: SecurityLevel::Medium,
        penalty: 10,
        risk: RiskEntry {
            factor: "Moderate Security Risk",
            severity: RiskSeverity::Medium,
            detail: "Standard security precautions required",
            icon: "🔒",
        },
    },
    SecurityRule {
        level: SecurityLevel::Low,
        penalty: 0,
        risk: RiskEntry {
            factor: "Low Security Risk",
            severity: RiskSeverity::Low,
            detail: "No significant security incidents nearby - routine precautions apply",
            icon: "🟢",
        },
    },
];

impl RiskEntry {
    fn to_factor(&self, disaster_type: Option<EventType>) -> RiskFactor {
        RiskFactor {
            factor: self.factor.to_string(),
            severity: self.severity,
            detail: self.detail.to_string(),
            icon: self.icon.to_string(),
            disaster_type,
        }
    }
}

/// Distance used for scoring; unusable values count as "at the hazard"
fn scoring_distance(impact: &Impact) -> f64 {
    if impact.distance_km.is_finite() && impact.distance_km >= 0.0 {
        impact.distance_km
    } else {
        0.0
    }
}

/// Assess campaign viability with default decision thresholds
pub fn assess_viability(
    facility: &Facility,
    impacts: &[Impact],
    security: Option<&SecurityAssessment>,
) -> ViabilityAssessment {
    assess_viability_with_thresholds(facility, impacts, security, &DecisionThresholds::default())
}

/// Assess campaign viability with custom decision thresholds
pub fn assess_viability_with_thresholds(
    facility: &Facility,
    impacts: &[Impact],
    security: Option<&SecurityAssessment>,
    thresholds: &DecisionThresholds,
) -> ViabilityAssessment {
    let mut score: i32 = 100;
    let mut risks = Vec::new();
    let mut mitigations = Vec::new();

    for impact in impacts {
        let distance = scoring_distance(impact);
        let hazard_type = impact.disaster.event_type;
        let name = hazard_type.display_name();

        if let Some(band) = PROXIMITY_BANDS.iter().find(|b| distance < b.below_km) {
            score -= band.penalty;
            risks.push(RiskFactor {
                factor: "Disaster Proximity".to_string(),
                severity: band.severity,
                detail: band.detail(name, distance),
                icon: band.icon.to_string(),
                disaster_type: Some(hazard_type),
            });
            if let Some(strategy) = band.strategy {
                mitigations.push(MitigationStrategy {
                    risk: "Disaster Proximity".to_string(),
                    strategy: strategy.replace("{hazard}", name),
                });
            }
        }

        if let Some(level) = impact.disaster.alert_level {
            if let Some(rule) = ALERT_RULES.iter().find(|r| r.level == level) {
                score -= rule.penalty;
                risks.push(RiskFactor {
                    factor: rule.factor.to_string(),
                    severity: rule.severity,
                    detail: format!(
                        "{} alert for {} - {}",
                        level.as_str().to_uppercase(),
                        name,
                        rule.outlook
                    ),
                    icon: rule.icon.to_string(),
                    disaster_type: Some(hazard_type),
                });
            }
        }

        if let Some(advisory) = HAZARD_ADVISORIES
            .iter()
            .find(|a| a.event_type == hazard_type)
        {
            risks.extend(advisory.risks.iter().map(|r| r.to_factor(Some(hazard_type))));
            mitigations.push(MitigationStrategy {
                risk: advisory.mitigation.0.to_string(),
                strategy: advisory.mitigation.1.to_string(),
            });
        }
    }

    for rule in SYSTEMIC_RULES {
        let fires = impacts.iter().any(|impact| {
            rule.hazard_types.contains(&impact.disaster.event_type)
                && scoring_distance(impact) < rule.below_km
        });
        if fires {
            score -= rule.penalty;
            risks.push(rule.risk.to_factor(None));
            mitigations.push(MitigationStrategy {
                risk: rule.risk.factor.to_string(),
                strategy: rule.strategy.to_string(),
            });
        }
    }

    if let Some(assessment) = security {
        if let Some(rule) = SECURITY_RULES
            .iter()
            .find(|r| r.level == assessment.security_level)
        {
            score -= rule.penalty;
            risks.push(rule.risk.to_factor(None));
        }
    }

    // Most severe first; ties keep rule order
    risks.sort_by(|a, b| b.severity.cmp(&a.severity));

    let viability_score = score.clamp(0, 100) as u8;
    let decision = decision_for_score(viability_score, thresholds);

    ViabilityAssessment {
        viability_score,
        decision,
        risks,
        mitigation_strategies: mitigations,
        timeline: decision.timeline(),
        security_assessment: security.cloned(),
        facility_name: facility.name.clone(),
    }
}
