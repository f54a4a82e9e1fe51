use anyhow::Context;
use clap::Parser;
use generator::profile::{build_corpus, write_corpus, GeneratorConfig};
use log::{info, warn};
use quality::check::check_output;
use serde::Serialize;
use std::path::PathBuf;
use trajcore::ais_interface::Feature;
use workflow::cancel::CancellationFlag;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod quality;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Prepares raw AIS reports as model-ready trajectory features")]
struct Args {
    /// Load a workflow config from YAML (overrides the path and stage flags)
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value = "data/merged/ais_merged.csv")]
    input: PathBuf,
    #[arg(long, default_value = "data/final/ais_final.csv")]
    output: PathBuf,
    #[arg(long, default_value = "data/final/feature_stats.json")]
    statistics: PathBuf,
    #[arg(long, default_value_t = 60)]
    cadence_seconds: i64,
    #[arg(long, default_value_t = 10)]
    rolling_window: usize,
    /// Exclude vessels reporting outside the operating region
    #[arg(long, default_value_t = false)]
    strict_projection: bool,
    /// Write a synthetic raw corpus with this many vessels to the input path first
    #[arg(long)]
    generate: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Run the quality check on the output table after the run
    #[arg(long, default_value_t = false)]
    check: bool,
    /// Only run the quality check on an existing output table
    #[arg(long, default_value_t = false)]
    check_only: bool,
    /// Append a one-line run report to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print reports as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn print_report<T: Serialize + std::fmt::Display>(report: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("serializing report")?
        );
    } else {
        println!("{report}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = args.workflow.as_ref() {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.input.clone(),
            args.output.clone(),
            args.statistics.clone(),
            args.cadence_seconds,
            args.rolling_window,
            args.strict_projection,
        )
    };
    if args.report.is_some() {
        workflow_config.report = args.report.clone();
    }

    if args.check_only {
        let quality = check_output(&workflow_config.output)?;
        return print_report(&quality, args.json);
    }

    if let Some(vessels) = args.generate {
        let generator = GeneratorConfig {
            vessels,
            seed: args.seed,
            ..Default::default()
        };
        let corpus = build_corpus(&generator)?;
        write_corpus(&workflow_config.input, &corpus).with_context(|| {
            format!(
                "writing synthetic corpus {}",
                workflow_config.input.display()
            )
        })?;
        info!(
            "generated {} reports for {} vessels into {}",
            corpus.len(),
            vessels + 1,
            workflow_config.input.display()
        );
    }

    let cancel = CancellationFlag::new();
    cancel.install_ctrl_c()?;
    let runner = Runner::new(workflow_config.clone()).with_cancellation(cancel);
    let result = runner.execute()?;

    let speed = result.statistics.get(Feature::SpeedOverGround);
    info!("speed_over_ground mean {:.3} std {:.3}", speed.mean, speed.std);
    print_report(&result.report, args.json)?;
    info!(
        "features written to {}, statistics to {}",
        workflow_config.output.display(),
        workflow_config.statistics.display()
    );

    if args.check {
        let quality = check_output(&workflow_config.output)?;
        if quality.non_finite_cells() > 0 {
            warn!("{} non-finite cells in the output table", quality.non_finite_cells());
        }
        print_report(&quality, args.json)?;
    }

    Ok(())
}
