//! Hazardscope CLI - facility impact matching and campaign viability scoring

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hazardscope_core::config::{self, ResolvedConfig};
use hazardscope_core::district::District;
use hazardscope_core::report::{
    render_assessments_text, render_districts_text, render_statistics_text,
};
use hazardscope_core::security::{assess_security, ConflictEvent};
use hazardscope_core::viability::assess_viability_with_thresholds;
use hazardscope_core::{
    analyze_with_config, districts_with_config, load_json_array, render_brief, render_json,
    render_text, sort_assessments, Facility, HazardEvent, Impact, MatchResult, SecurityAssessment,
    ViabilityAssessment,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hazardscope")]
#[command(about = "Match facilities against hazard impact zones and score campaign viability")]
#[command(version = env!("HAZARDSCOPE_VERSION"))]
struct Cli {
    /// Enable debug logging (overrides HAZARDSCOPE_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Facility and hazard inputs shared by the analysis commands
#[derive(clap::Args)]
struct Inputs {
    /// JSON array of facilities
    #[arg(long)]
    facilities: PathBuf,

    /// JSON array of hazard events
    #[arg(long)]
    hazards: PathBuf,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List facilities inside at least one hazard impact zone
    Match {
        #[command(flatten)]
        inputs: Inputs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Score campaign viability for impacted facilities
    Assess {
        #[command(flatten)]
        inputs: Inputs,

        /// Score only this facility (scored even when not impacted)
        #[arg(long)]
        facility: Option<String>,

        /// JSON array of security assessments, matched by facilityName
        #[arg(long)]
        security: Option<PathBuf>,

        /// JSON array of conflict incidents used to derive security levels
        #[arg(long)]
        conflicts: Option<PathBuf>,

        /// Reference date for the conflict window (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Dashboard statistics rollup
    Stats {
        #[command(flatten)]
        inputs: Inputs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// District-level impact rollup
    Districts {
        /// JSON array of districts
        #[arg(long)]
        districts: PathBuf,

        #[command(flatten)]
        inputs: Inputs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Match { inputs, format } => {
            reject_markdown(format)?;
            let (config, facilities, hazards) = load_inputs(&inputs)?;
            let (result, _) = analyze_with_config(&facilities, &hazards, &config);
            report_skipped(&result);

            match format {
                OutputFormat::Json => println!("{}", render_json(&result)),
                _ => print!("{}", render_text(&result.impacted_facilities)),
            }
        }
        Commands::Assess {
            inputs,
            facility,
            security,
            conflicts,
            as_of,
            format,
        } => {
            let (config, facilities, hazards) = load_inputs(&inputs)?;
            let (result, _) = analyze_with_config(&facilities, &hazards, &config);
            report_skipped(&result);

            let overrides: Vec<SecurityAssessment> = match &security {
                Some(path) => load_json_array(path)?,
                None => Vec::new(),
            };
            let incidents: Vec<ConflictEvent> = match &conflicts {
                Some(path) => load_json_array(path)?,
                None => Vec::new(),
            };
            let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());

            let targets = scoring_targets(&facilities, &result, facility.as_deref())?;

            let assessments: Vec<ViabilityAssessment> = targets
                .par_iter()
                .map(|&(target, impacts)| {
                    let security = security_for(
                        target,
                        &overrides,
                        conflicts.is_some().then_some(incidents.as_slice()),
                        as_of,
                        &config,
                    );
                    assess_viability_with_thresholds(
                        target,
                        impacts,
                        security.as_ref(),
                        &config.thresholds,
                    )
                })
                .collect();
            let assessments = sort_assessments(assessments);

            match format {
                OutputFormat::Json => println!("{}", render_json(&assessments)),
                OutputFormat::Markdown => {
                    for assessment in &assessments {
                        println!("{}", render_brief(&assessment.facility_name, assessment));
                    }
                }
                OutputFormat::Text => print!("{}", render_assessments_text(&assessments)),
            }
        }
        Commands::Stats { inputs, format } => {
            reject_markdown(format)?;
            let (config, facilities, hazards) = load_inputs(&inputs)?;
            let (result, stats) = analyze_with_config(&facilities, &hazards, &config);
            report_skipped(&result);

            match format {
                OutputFormat::Json => println!("{}", render_json(&stats)),
                _ => print!("{}", render_statistics_text(&stats)),
            }
        }
        Commands::Districts {
            districts,
            inputs,
            format,
        } => {
            reject_markdown(format)?;
            let (config, facilities, hazards) = load_inputs(&inputs)?;
            let districts: Vec<District> = load_json_array(&districts)?;
            let (result, summaries) =
                districts_with_config(&districts, &facilities, &hazards, &config);
            report_skipped(&result);

            if summaries.is_empty() {
                eprintln!("No facilities found in any district");
            }

            match format {
                OutputFormat::Json => println!("{}", render_json(&summaries)),
                _ => print!("{}", render_districts_text(&summaries)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HAZARDSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn reject_markdown(format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Markdown {
        anyhow::bail!("--format markdown is only supported by the assess command");
    }
    Ok(())
}

/// Load config plus facility and hazard files
fn load_inputs(
    inputs: &Inputs,
) -> anyhow::Result<(ResolvedConfig, Vec<Facility>, Vec<HazardEvent>)> {
    let config = load_config(inputs.config.as_deref())?;
    let facilities: Vec<Facility> =
        load_json_array(&inputs.facilities).context("failed to load facilities")?;
    let hazards: Vec<HazardEvent> =
        load_json_array(&inputs.hazards).context("failed to load hazards")?;
    tracing::debug!(
        facilities = facilities.len(),
        hazards = hazards.len(),
        "inputs loaded"
    );
    Ok((config, facilities, hazards))
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let root = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&root, config_path).context("failed to load configuration")?;

    if let Some(path) = &resolved.config_path {
        eprintln!("Using config: {}", path.display());
    }
    Ok(resolved)
}

fn report_skipped(result: &MatchResult) {
    if result.skipped_facilities > 0 || result.skipped_hazards > 0 {
        eprintln!(
            "Skipped {} malformed facility record(s) and {} hazard(s)",
            result.skipped_facilities, result.skipped_hazards
        );
    }
}

/// Facilities to score, each paired with its own impacts
///
/// Without a name every impacted row is scored, so rows sharing a name keep
/// their own impacts. A named lookup takes the first row with that name.
fn scoring_targets<'a>(
    facilities: &'a [Facility],
    result: &'a MatchResult,
    name: Option<&str>,
) -> anyhow::Result<Vec<(&'a Facility, &'a [Impact])>> {
    match name {
        Some(name) => {
            let found = facilities
                .iter()
                .find(|f| f.name == name)
                .with_context(|| format!("facility not found: {}", name))?;
            Ok(vec![(found, result.impacts_for(name))])
        }
        None => Ok(result
            .impacted_facilities
            .iter()
            .map(|s| (&s.facility, s.impacts.as_slice()))
            .collect()),
    }
}

/// Security input for one facility
///
/// An explicit assessment naming the facility wins, then one without a
/// name (applies to all), then the conflict-derived assessment.
fn security_for(
    facility: &Facility,
    overrides: &[SecurityAssessment],
    incidents: Option<&[ConflictEvent]>,
    as_of: NaiveDate,
    config: &ResolvedConfig,
) -> Option<SecurityAssessment> {
    let named = overrides
        .iter()
        .find(|s| s.facility_name.as_deref() == Some(facility.name.as_str()));
    let blanket = overrides.iter().find(|s| s.facility_name.is_none());

    named.or(blanket).cloned().or_else(|| {
        incidents.map(|events| assess_security(facility, events, as_of, &config.conflict))
    })
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();

    let r = &resolved.radii;
    println!("Radii (km):");
    println!(
        "  eq: magnitude x {} (default magnitude {})",
        r.km_per_magnitude, r.default_magnitude
    );
    println!("  tc: {}", r.tropical_cyclone);
    println!("  fl: {}", r.flood);
    println!("  vo: {}", r.volcano);
    println!("  dr: {}", r.drought);
    println!("  wf: {}", r.wildfire);
    println!("  ts: {}", r.tsunami);
    println!("  unknown: {}", r.unknown);
    println!();

    println!("Thresholds:");
    println!("  go: {}", resolved.thresholds.go);
    println!("  caution: {}", resolved.thresholds.caution);
    println!("  delay: {}", resolved.thresholds.delay);
    println!();

    println!("Conflict:");
    println!("  window_days: {}", resolved.conflict.window_days);
    println!();

    let f = &resolved.filter;
    println!("Filter:");
    let event_types = join_or_all(f.event_types.iter().map(|t| t.code().to_string()));
    let alert_levels = join_or_all(f.alert_levels.iter().map(|l| l.as_str().to_string()));
    println!("  event_types: {}", event_types);
    println!("  alert_levels: {}", alert_levels);
    println!("  severities: {}", join_or_all(f.severities.iter().cloned()));
    println!("  certainties: {}", join_or_all(f.certainties.iter().cloned()));
    println!("  urgencies: {}", join_or_all(f.urgencies.iter().cloned()));
}

fn join_or_all(values: impl Iterator<Item = String>) -> String {
    let values: Vec<String> = values.collect();
    if values.is_empty() {
        "all".to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardscope_core::{match_impacts, EventType};

    fn duplicate_rows() -> (Vec<Facility>, MatchResult) {
        let facilities = vec![
            Facility::new("Mobile Unit", 0.0, 0.0),
            Facility::new("Mobile Unit", 40.0, 40.0),
        ];
        let hazards = vec![
            HazardEvent::new("fl", EventType::Flood, 0.0, 0.0),
            HazardEvent::new("vo", EventType::Volcano, 40.0, 40.0),
        ];
        let result = match_impacts(&facilities, &hazards);
        (facilities, result)
    }

    #[test]
    fn test_shared_name_rows_keep_their_own_impacts() {
        let (facilities, result) = duplicate_rows();
        let targets = scoring_targets(&facilities, &result, None).unwrap();

        assert_eq!(targets.len(), 2);
        let ids: Vec<&str> = targets
            .iter()
            .map(|(_, impacts)| impacts[0].disaster.id.as_str())
            .collect();
        assert_eq!(ids, vec!["fl", "vo"]);
        assert_eq!(targets[1].0.latitude, 40.0);
        assert!(targets.iter().all(|(_, impacts)| impacts.len() == 1));
    }

    #[test]
    fn test_named_target() {
        let (facilities, result) = duplicate_rows();
        let targets = scoring_targets(&facilities, &result, Some("Mobile Unit")).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].1[0].disaster.id, "fl");

        assert!(scoring_targets(&facilities, &result, Some("Nowhere")).is_err());
    }
}
