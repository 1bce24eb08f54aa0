use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use inm_auto::automation::BridgeBackend;
use inm_auto::config::{default_config_path, BatchConfig, REFERENCE_STUDY};
use inm_auto::driver::{directory_segments, InmDriver};
use inm_auto::orchestrator::{run_batch, Orchestrator};
use inm_auto::prepare::prepare_studies;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "inm-auto",
    version,
    about = "Batch automation of INM 7.0 noise studies"
)]
pub struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the configured studies one after another
    Run(RunArgs),
    /// Create study folders from flight data folders
    Prepare(PrepareArgs),
    /// Print the folder entries the driver selects to reach PATH
    Segments {
        path: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Batch configuration (JSON); defaults to <config dir>/inm-auto/batch.json
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run only this study (repeatable)
    #[arg(long = "study")]
    pub studies: Vec<String>,

    /// Attempts per driver operation
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Upper bound on a single run
    #[arg(long)]
    pub run_timeout: Option<humantime::Duration>,

    /// Write the batch report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PrepareArgs {
    /// Folder holding one subfolder of .dbf inputs per flight
    #[arg(long, default_value = "INM Files/MCDP Flight Trials")]
    pub data_root: PathBuf,

    /// Folder holding the reference study; new studies are created next to it
    #[arg(long, default_value = "INM Studies")]
    pub studies_root: PathBuf,

    /// Name of the reference study folder
    #[arg(long, default_value = REFERENCE_STUDY)]
    pub reference: String,
}

/// Install the stderr log subscriber.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "inm_auto=debug" } else { "inm_auto=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: Cli) -> Result<()> {
    match args.command {
        Command::Run(run) => run_studies(run),
        Command::Prepare(prepare) => {
            let created =
                prepare_studies(&prepare.data_root, &prepare.studies_root, &prepare.reference)?;
            println!("{} studies created", created.len());
            Ok(())
        }
        Command::Segments { path } => {
            for segment in directory_segments(&path) {
                println!("{segment}");
            }
            Ok(())
        }
    }
}

/// Apply command-line overrides on top of the loaded configuration.
fn build_config(args: &RunArgs) -> Result<BatchConfig> {
    let path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = BatchConfig::load(&path)?;
    if !args.studies.is_empty() {
        config.studies = args.studies.clone();
    }
    if let Some(n) = args.max_attempts {
        config.driver.max_attempts = n;
    }
    if let Some(t) = args.run_timeout {
        config.driver.run_timeout = t.into();
    }
    Ok(config)
}

fn run_studies(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let plans = config.plans()?;
    if plans.is_empty() {
        bail!("no study to run in {}", config.studies_root.display());
    }

    let backend = BridgeBackend::start(&config.host).context("failed to start automation host")?;
    let mut driver = InmDriver::new(backend, config.inm_exe.clone(), config.driver.clone());
    let orchestrator = Orchestrator::new(config.studies_root.clone());
    let report = run_batch(&mut driver, &orchestrator, &plans);

    for line in report.lines() {
        println!("{line}");
    }
    if let Some(path) = args.report.as_deref() {
        report.write_json(path)?;
        eprintln!("Saved: {}", path.display());
    }
    if let Some(reason) = report.aborted {
        bail!("batch aborted: {reason}");
    }
    Ok(())
}
