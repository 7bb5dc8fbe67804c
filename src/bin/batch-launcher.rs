//! # Batch Launcher
//!
//! Command-line launcher for the sample jobs. Runs one job by name with
//! `key=value[,type[,identifying]]` parameters and exits with the code
//! mapped from the job's exit status.

use anyhow::Context;
use batch_core::config::BatchConfig;
use batch_core::launch::exit_codes::{ExitCodeMapper, JOB_NOT_PROVIDED};
use batch_core::launch::{parameters_from_args, JobOperator};
use batch_core::logging;
use batch_core::repository::InMemoryJobRepository;
use batch_core::samples::sample_registry;
use batch_core::BatchError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "batch-launcher")]
#[command(about = "Run batch jobs by name")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (toml, json or yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a registered job
    Run {
        /// Job name
        job: String,

        /// Job parameters as key=value[,type[,identifying]]
        parameters: Vec<String>,
    },

    /// List registered jobs
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mapper = ExitCodeMapper::new();

    let code = match run(cli, &mapper).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {e:#}");
            eprintln!("error: {e:#}");
            mapper.int_value("FAILED")
        }
    };
    process::exit(code);
}

async fn run(cli: Cli, mapper: &ExitCodeMapper) -> anyhow::Result<i32> {
    let mut config = BatchConfig::load(cli.config.as_ref()).context("loading configuration")?;
    if cli.json {
        config.json_logs = true;
    }
    logging::init_with_config(&config);

    let registry = Arc::new(sample_registry().context("building sample jobs")?);

    let (job_name, args) = match cli.command {
        Some(Commands::List) => {
            for name in registry.job_names() {
                println!("{name}");
            }
            return Ok(0);
        }
        Some(Commands::Run { job, parameters }) => (job, parameters),
        None => {
            eprintln!("No job name given. Available jobs: {}", registry.job_names().join(", "));
            return Ok(mapper.int_value(JOB_NOT_PROVIDED));
        }
    };

    let operator = JobOperator::from_config(
        &config,
        registry,
        Arc::new(InMemoryJobRepository::new()),
    );

    let parameters = match parameters_from_args(&args) {
        Ok(parameters) => parameters,
        Err(source) => {
            let result = Err(BatchError::InvalidParameters { job_name, source });
            report(&result);
            return Ok(mapper.for_result(&result));
        }
    };

    let handle = match operator.start_with_parameters(&job_name, parameters) {
        Ok(handle) => handle,
        Err(e) => {
            let result = Err(e);
            report(&result);
            return Ok(mapper.for_result(&result));
        }
    };

    let waiting = handle.wait();
    tokio::pin!(waiting);
    let result = tokio::select! {
        result = &mut waiting => result,
        _ = tokio::signal::ctrl_c() => {
            warn!(job_name = %job_name, "Interrupt received, stopping job");
            operator.stop_all();
            waiting.await
        }
    };

    report(&result);
    Ok(mapper.for_result(&result))
}

fn report(result: &batch_core::BatchResult<batch_core::JobExecution>) {
    match result {
        Ok(execution) => {
            info!(
                job_name = %execution.job_name(),
                status = %execution.status(),
                exit_status = %execution.exit_status,
                "✅ Job finished"
            );
            println!(
                "{}: {} ({})",
                execution.job_name(),
                execution.status(),
                execution.exit_status
            );
            for step in &execution.step_executions {
                println!(
                    "  {}: {} read={} written={} filtered={} commits={} rollbacks={}",
                    step.step_name,
                    step.status(),
                    step.read_count,
                    step.write_count,
                    step.filter_count,
                    step.commit_count,
                    step.rollback_count
                );
            }
        }
        Err(e) => {
            error!("❌ Job launch failed: {e}");
            eprintln!("Job launch failed: {e}");
        }
    }
}
