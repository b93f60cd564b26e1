//! Intervention engine CLI
//!
//! Main entry point for the `intervene` command.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use intervention_engine::{EngineConfig, Experiment, ExperimentOutcome, ProbabilisticModel, Scenario};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "intervene")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Apply randomizing and locking interventions to causal models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the nearest intervene.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the manipulated graph and the classification of every edge
    Graph {
        /// Scenario file (.toml or .json)
        #[arg(value_name = "FILE")]
        scenario: PathBuf,
    },

    /// Print the joint distribution of the studied variables
    Table {
        /// Scenario file with a discrete model
        #[arg(value_name = "FILE")]
        scenario: PathBuf,

        /// Decimal places (overrides the configuration)
        #[arg(short, long)]
        precision: Option<usize>,
    },

    /// Print the implied covariance matrix of the manipulated linear model
    Covariance {
        /// Scenario file with a linear model
        #[arg(value_name = "FILE")]
        scenario: PathBuf,

        /// Decimal places (overrides the configuration)
        #[arg(short, long)]
        precision: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Graph { scenario } => {
            let config = load_config(cli.config.as_deref(), &scenario)?;
            show_graph(&run(&scenario, config)?)
        }
        Commands::Table {
            scenario,
            precision,
        } => {
            let config = load_config(cli.config.as_deref(), &scenario)?;
            let precision = precision.unwrap_or(config.display_precision);
            show_table(&run(&scenario, config)?, precision)
        }
        Commands::Covariance {
            scenario,
            precision,
        } => {
            let config = load_config(cli.config.as_deref(), &scenario)?;
            let precision = precision.unwrap_or(config.display_precision);
            show_covariance(&run(&scenario, config)?, precision)
        }
    }
}

/// Explicit --config, then the nearest intervene.toml, then defaults
fn load_config(explicit: Option<&Path>, scenario: &Path) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::from_file(path).into_diagnostic();
    }
    let start = scenario
        .canonicalize()
        .unwrap_or_else(|_| scenario.to_path_buf());
    Ok(EngineConfig::find_config(&start).unwrap_or_default())
}

fn run(path: &Path, config: EngineConfig) -> Result<ExperimentOutcome> {
    let scenario = Scenario::from_file(path)?;
    let (truth, setup) = scenario.build(&config)?;
    tracing::info!(
        scenario = %path.display(),
        family = truth.family(),
        variables = truth.graph().len(),
        "loaded scenario"
    );
    let outcome = Experiment::new(truth).with_config(config).run(&setup)?;
    for approximation in &outcome.approximations {
        tracing::warn!("approximate parameter mapping: {:?}", approximation);
    }
    Ok(outcome)
}

fn show_graph(outcome: &ExperimentOutcome) -> Result<()> {
    let manipulated = &outcome.manipulated_graph;
    println!("Variables:");
    for variable in manipulated.graph().variables() {
        let manipulation = manipulated
            .manipulation_of(&variable.name)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("  {:<16} {}", variable.name, manipulation);
    }

    println!("Edges:");
    for classified in manipulated.classified_edges() {
        println!("  {:<32} {}", classified.edge.to_string(), classified.classification);
    }
    Ok(())
}

fn show_table(outcome: &ExperimentOutcome, precision: usize) -> Result<()> {
    match &outcome.joint {
        Some(joint) if joint.is_empty() => {
            println!("No studied variables.");
            Ok(())
        }
        Some(joint) => {
            print!("{:.*}", precision, joint);
            Ok(())
        }
        None => Err(miette::miette!(
            "joint tables need a discrete model, this scenario is {}",
            outcome.manipulated_model.family()
        )),
    }
}

fn show_covariance(outcome: &ExperimentOutcome, precision: usize) -> Result<()> {
    match &outcome.manipulated_model {
        ProbabilisticModel::Linear(model) => {
            print!("{:.*}", precision, model.implied_covariance());
            let means = model.implied_means();
            println!("Means:");
            for (name, mean) in model.graph().variable_names().iter().zip(means) {
                println!("  {:<16} {:.*}", name, precision, mean);
            }
            Ok(())
        }
        ProbabilisticModel::Discrete(_) => Err(miette::miette!(
            "covariance needs a linear model, this scenario is discrete"
        )),
    }
}
