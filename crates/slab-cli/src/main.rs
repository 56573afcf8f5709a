use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use slab_io::{
    IoError, ModelData, PatchInput, PatchOptions, Patcher, generate_report, load_model_input,
};
use slab_model::ModelError;
use slab_solver::{MatchPolicy, Pipeline, PipelineConfig, PipelineOutput, SolverError};
use slab_text::{LocateError, SectionKind, SectionMap, locate_file};
use thiserror::Error;

mod logger;

#[derive(Parser)]
#[command(
    name = "slab",
    version,
    about = "Transfer slab bedding stiffness from an analysis model into a target model file"
)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the section layout of a target model file
    Locate(LocateArgs),
    /// Run correlation and rigidity and print the report
    Report(ReportArgs),
    /// Run the pipeline and write its records into a target model file
    Patch(PatchArgs),
}

#[derive(Args)]
struct LocateArgs {
    /// Target model file
    #[arg(value_name = "TARGET")]
    target: PathBuf,
}

#[derive(Args)]
struct PipelineArgs {
    /// JSON model input (nodes, elements, stresses)
    #[arg(long, value_name = "PATH")]
    model: PathBuf,

    /// JSON pipeline configuration; flags below override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Per-axis node matching tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Candidate selection: first|nearest|unique
    #[arg(long)]
    policy: Option<MatchPolicy>,

    /// Let elements match on their correlated nodes only
    #[arg(long)]
    partial_coverage: bool,
}

#[derive(Args)]
struct ReportArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args)]
struct PatchArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Target model file, patched in place
    #[arg(long, value_name = "PATH")]
    target: PathBuf,

    /// Skip the timestamped backup copy
    #[arg(long)]
    no_backup: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Locate(#[from] LocateError),
}

fn pipeline_config(args: &PipelineArgs) -> Result<PipelineConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| CliError::Config {
                path: path.clone(),
                source,
            })?
        }
        None => PipelineConfig::default(),
    };
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if args.partial_coverage {
        config.coverage = slab_solver::CoveragePolicy::Partial;
    }
    Ok(config)
}

fn run_pipeline(args: &PipelineArgs) -> Result<(ModelData, PipelineOutput), CliError> {
    let config = pipeline_config(args)?;
    info!("loading model input {}", args.model.display());
    let data = load_model_input(&args.model)?.build()?;
    let output = Pipeline::new(config).run(&data.source, &data.target, &data.stresses)?;
    Ok((data, output))
}

fn print_section_map(path: &Path, map: &SectionMap) {
    println!("file: {}", path.display());
    println!("lines: {}", map.line_count);
    for kind in SectionKind::ALL {
        match map.get(kind) {
            Some(section) => {
                let last = section
                    .last_record
                    .map_or_else(|| "-".to_string(), |line| (line + 1).to_string());
                println!(
                    "{kind}: lines {}..{}, last record {last}",
                    section.start + 1,
                    section.end + 1
                );
            }
            None => println!("{kind}: absent"),
        }
    }
    println!("support anchor: {}", map.support_anchor() + 1);
    match map.stiffness_anchor() {
        Some(line) => println!("stiffness anchor: {}", line + 1),
        None => println!("stiffness anchor: new section before line {}", map.tail.start + 1),
    }
    println!("bedding anchor: {}", map.bedding_anchor() + 1);
}

fn run_locate(args: LocateArgs) -> Result<(), CliError> {
    let (_, map) = locate_file(&args.target)?;
    print_section_map(&args.target, &map);
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), CliError> {
    let (data, output) = run_pipeline(&args.pipeline)?;
    let input = PatchInput::new(&data.source, &data.target, &output);
    print!("{}", generate_report(&input));
    Ok(())
}

fn run_patch(args: PatchArgs) -> Result<(), CliError> {
    let (data, output) = run_pipeline(&args.pipeline)?;
    let input = PatchInput::new(&data.source, &data.target, &output);
    let patcher = Patcher::new(PatchOptions {
        backup: !args.no_backup,
    });
    let outcome = patcher.write(&args.target, &input)?;
    print!("{}", generate_report(&input));
    println!();
    print!("{outcome}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose));

    let result = match cli.command {
        Commands::Locate(args) => run_locate(args),
        Commands::Report(args) => run_report(args),
        Commands::Patch(args) => run_patch(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}
