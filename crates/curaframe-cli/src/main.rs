//! CuraFrame CLI
//!
//! The `curaframe` command evaluates candidates against constraint bundles.
//!
//! ## Commands
//!
//! - `evaluate`: Evaluate one or more candidates against a bundle
//! - `bundles`: List the bundled constraint sets
//! - `show`: Print a bundle's constraints with provenance
//! - `populations`: List populations and their modifiers
//! - `check`: Validate a bundle document

mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use curaframe_core::{
    BundleError, Candidate, ConstraintBundle, Engine, EngineConfig, EvaluationResult,
    PopulationRegistry, DEFAULT_VERIFICATION_THRESHOLD,
};

#[derive(Parser)]
#[command(name = "curaframe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic constraint evaluation for candidate safety screening", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate candidates against a constraint bundle
    Evaluate {
        /// Catalog bundle name or path to a bundle document
        #[arg(short, long)]
        bundle: String,

        /// Candidate file (YAML or JSON): one candidate or a list
        #[arg(short, long)]
        candidates: PathBuf,

        /// Population to tighten the bundle for
        #[arg(short, long)]
        population: Option<String>,

        /// Additional populations document
        #[arg(long)]
        populations: Option<PathBuf>,

        /// Engine configuration file (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Exit with status 2 when any candidate is rejected
        #[arg(long)]
        fail_on_reject: bool,
    },

    /// List the bundled constraint sets
    Bundles,

    /// Print a bundle's constraints with provenance
    Show {
        /// Catalog bundle name or path to a bundle document
        bundle: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List populations and their modifiers
    Populations {
        /// Additional populations document
        #[arg(long)]
        populations: Option<PathBuf>,
    },

    /// Validate a bundle document
    Check {
        /// Path to the bundle document
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// A candidate file holds one candidate or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    Many(Vec<Candidate>),
    One(Candidate),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Evaluate {
            bundle,
            candidates,
            population,
            populations,
            config,
            format,
            fail_on_reject,
        } => cmd_evaluate(
            &bundle,
            &candidates,
            population.as_deref(),
            populations.as_deref(),
            config.as_deref(),
            format,
            fail_on_reject,
        ),
        Commands::Bundles => cmd_bundles(),
        Commands::Show { bundle, format } => cmd_show(&bundle, format),
        Commands::Populations { populations } => cmd_populations(populations.as_deref()),
        Commands::Check { file } => cmd_check(&file),
    }
}

fn load_bundle(name_or_path: &str) -> Result<ConstraintBundle> {
    let path = Path::new(name_or_path);
    if path.is_file() {
        return ConstraintBundle::from_file(path)
            .with_context(|| format!("Failed to load bundle from {}", path.display()));
    }
    curaframe_catalog::bundle(name_or_path)
        .with_context(|| format!("Failed to load bundle '{}'", name_or_path))
}

fn load_populations(extra: Option<&Path>) -> Result<PopulationRegistry> {
    let mut registry = curaframe_catalog::standard_populations()
        .context("Failed to load standard populations")?;
    if let Some(path) = extra {
        let more = PopulationRegistry::from_yaml_file(path)
            .with_context(|| format!("Failed to load populations from {}", path.display()))?;
        registry.extend(more);
    }
    Ok(registry)
}

fn load_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read candidates from {}", path.display()))?;
    let file: CandidateFile = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse candidates in {}", path.display()))?;
    Ok(match file {
        CandidateFile::Many(candidates) => candidates,
        CandidateFile::One(candidate) => vec![candidate],
    })
}

fn cmd_evaluate(
    bundle: &str,
    candidates: &Path,
    population: Option<&str>,
    populations: Option<&Path>,
    config: Option<&Path>,
    format: OutputFormat,
    fail_on_reject: bool,
) -> Result<ExitCode> {
    let bundle = load_bundle(bundle)?;
    let registry = load_populations(populations)?;
    let config = match config {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load engine config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = Engine::with_populations(registry).with_config(config);
    let candidates = load_candidates(candidates)?;

    let results = candidates
        .iter()
        .map(|candidate| {
            engine
                .evaluate(candidate, &bundle.set, population)
                .with_context(|| format!("Failed to evaluate candidate '{}'", candidate.name))
        })
        .collect::<Result<Vec<EvaluationResult>>>()?;

    let rejected = results.iter().filter(|r| r.is_rejected()).count();
    info!(
        candidates = results.len(),
        rejected,
        bundle = %bundle.set.name(),
        "batch evaluation complete"
    );

    match format {
        OutputFormat::Text => {
            let reports: Vec<String> = results.iter().map(EvaluationResult::summary).collect();
            println!("{}", reports.join("\n\n---\n\n"));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&results)?),
    }

    if fail_on_reject && rejected > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_bundles() -> Result<ExitCode> {
    let bundles = curaframe_catalog::bundles().context("Failed to load catalog")?;
    for (id, bundle) in bundles {
        println!("{:<12} {} ({} constraints)", id, bundle.set.name(), bundle.set.len());
        if let Some(description) = bundle.set.description() {
            println!("{:<12} {}", "", description);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(name_or_path: &str, format: OutputFormat) -> Result<ExitCode> {
    let bundle = load_bundle(name_or_path)?;
    match format {
        OutputFormat::Json => println!("{}", bundle.to_json()?),
        OutputFormat::Yaml => print!("{}", bundle.to_yaml()?),
        OutputFormat::Text => {
            println!("{} ({} constraints)", bundle.set.name(), bundle.set.len());
            if let Some(description) = bundle.set.description() {
                println!("{}", description);
            }
            for constraint in &bundle.set {
                println!();
                println!("  {}", constraint);
                println!("    Rationale: {}", constraint.rationale());
                println!("    Confidence: {}", constraint.confidence());
                if let Some(provenance) = constraint.provenance() {
                    println!("    Source: {}", provenance.source);
                    for reference in &provenance.references {
                        println!("      - {}", reference);
                    }
                    if let Some(date) = provenance.last_validated {
                        println!("    Last validated: {}", date);
                    }
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_populations(extra: Option<&Path>) -> Result<ExitCode> {
    let registry = load_populations(extra)?;
    for name in registry.names() {
        let Some(population) = registry.get(name) else {
            continue;
        };
        match population.description() {
            Some(description) => println!("{}: {}", name, description),
            None => println!("{}", name),
        }
        for (target, modifier) in population.modifiers() {
            println!("  {}: {}", target, modifier);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(path: &Path) -> Result<ExitCode> {
    match ConstraintBundle::from_file(path) {
        Ok(bundle) => {
            println!(
                "OK: {} (version {}, {} constraints)",
                bundle.set.name(),
                bundle.bundle_version,
                bundle.set.len()
            );
            for constraint in bundle
                .set
                .iter()
                .filter(|c| c.requires_verification(DEFAULT_VERIFICATION_THRESHOLD))
            {
                println!(
                    "  note: {} has confidence {} and requires verification",
                    constraint.label(),
                    constraint.confidence()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(BundleError::SchemaError(errors)) => {
            println!("INVALID: {}", path.display());
            for error in errors {
                println!("  - {}", error);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            println!("INVALID: {}: {}", path.display(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_candidate_file_accepts_single_or_list() {
        let single: CandidateFile = serde_yaml::from_str(
            "name: CF-001\nproperties:\n  hERG_IC50: 15.0\n  logP: 3\n",
        )
        .unwrap();
        assert!(matches!(single, CandidateFile::One(_)));

        let list: CandidateFile = serde_yaml::from_str(
            "- name: CF-001\n  properties: { logP: 3.1 }\n- name: CF-002\n  properties: { logP: 4.6 }\n",
        )
        .unwrap();
        match list {
            CandidateFile::Many(candidates) => assert_eq!(candidates.len(), 2),
            CandidateFile::One(_) => panic!("expected a list"),
        }
    }

    #[test]
    fn test_evaluate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "curaframe",
            "evaluate",
            "--bundle",
            "core_safety",
            "--candidates",
            "candidates.yaml",
            "--population",
            "asthmatic",
            "--format",
            "json",
            "--fail-on-reject",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                bundle,
                population,
                format,
                fail_on_reject,
                ..
            } => {
                assert_eq!(bundle, "core_safety");
                assert_eq!(population.as_deref(), Some("asthmatic"));
                assert!(format == OutputFormat::Json);
                assert!(fail_on_reject);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
