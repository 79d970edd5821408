//! pipesim - simulated CI/CD pipeline
//!
//! The `pipesim` command drives the simulated dashboard from the terminal.
//!
//! ## Commands
//!
//! - `build`, `deploy`, `test`, `rollback`: run one action and print the result
//! - `monitor`: poll metrics for a few samples
//! - `flow`: run the branch → pull request → merge workflow
//! - `demo`: scripted walkthrough of every action
//! - `shell`: interactive dashboard over stdin

mod render;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pipesim_core::{Environment, Notice, PipelineController, SimConfig};
use tracing::{info, Level};

use crate::render::{render_notice, render_sample, render_state};

/// Source used when `build` is given neither `--source` nor `--file`.
const DEFAULT_SOURCE: &str =
    "// Your application code here...\n// Add an \"error\" comment to simulate a build failure";

#[derive(Parser)]
#[command(name = "pipesim")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Simulated CI/CD pipeline (build, deploy, test, rollback, monitoring)", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file (overrides PIPESIM_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible failures and metrics
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Multiplier applied to every simulated delay (e.g. 0.1 for a fast run)
    #[arg(long, global = true)]
    time_scale: Option<f64>,

    /// Format for the dashboard printed after each command
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build source text ("error" anywhere in it fails the build)
    Build {
        /// Source text to build
        #[arg(short, long, conflicts_with = "file")]
        source: Option<String>,

        /// Read the source text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Deploy the last good build to an environment
    Deploy {
        /// staging or production
        environment: Environment,
    },

    /// Run integration tests in an environment
    Test {
        /// staging or production
        environment: Environment,
    },

    /// Roll an environment back to the previous version
    Rollback {
        /// staging or production
        environment: Environment,
    },

    /// Start monitoring, print samples, then stop
    Monitor {
        /// Number of samples to print
        #[arg(short = 'n', long, default_value = "3")]
        samples: usize,
    },

    /// Create a feature branch, open a pull request and merge it
    Flow,

    /// Walk through every action once
    Demo,

    /// Interactive dashboard over stdin
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pipesim_core::init_tracing(cli.json, level);

    let config = resolve_config(&cli)?;
    info!(
        seed = ?config.seed,
        time_scale = config.time_scale,
        "Starting pipeline simulation"
    );
    let controller = Arc::new(PipelineController::new(config));

    match cli.command {
        Commands::Build { source, file } => {
            let source = match (source, file) {
                (Some(source), _) => source,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .context(format!("Failed to read source file: {:?}", path))?,
                (None, None) => DEFAULT_SOURCE.to_string(),
            };
            cmd_build(&controller, &source, cli.output).await
        }
        Commands::Deploy { environment } => {
            let notice = controller.deploy(environment).await;
            report(&controller, &notice, cli.output)
        }
        Commands::Test { environment } => {
            let notice = controller.test(environment).await;
            report(&controller, &notice, cli.output)
        }
        Commands::Rollback { environment } => {
            let notice = controller.rollback(environment).await;
            report(&controller, &notice, cli.output)
        }
        Commands::Monitor { samples } => cmd_monitor(&controller, samples).await,
        Commands::Flow => cmd_flow(&controller, cli.output),
        Commands::Demo => cmd_demo(&controller, cli.output).await,
        Commands::Shell => shell::run(Arc::clone(&controller)).await,
    }
}

/// Defaults, then config file and `PIPESIM_*` env, then command-line flags.
fn resolve_config(cli: &Cli) -> Result<SimConfig> {
    let mut config =
        SimConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(time_scale) = cli.time_scale {
        config.time_scale = time_scale;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_state(controller: &PipelineController, output: OutputFormat) -> Result<()> {
    let state = controller.snapshot();
    match output {
        OutputFormat::Text => print!("{}", render_state(&state)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
    }
    Ok(())
}

fn report(controller: &PipelineController, notice: &Notice, output: OutputFormat) -> Result<()> {
    println!("{}", render_notice(notice));
    print_state(controller, output)
}

async fn cmd_build(
    controller: &PipelineController,
    source: &str,
    output: OutputFormat,
) -> Result<()> {
    println!("Building...");
    let notice = controller.build(source).await;
    report(controller, &notice, output)
}

/// Print `samples` monitoring samples, then stop the poller.
async fn cmd_monitor(controller: &PipelineController, samples: usize) -> Result<()> {
    let mut rx = controller.poller().subscribe();
    println!("{}", render_notice(&controller.start_monitoring()));
    println!(
        "Fetching a sample every {:?}...",
        controller.poller().interval()
    );

    for i in 1..=samples {
        rx.changed()
            .await
            .context("Monitoring poller shut down unexpectedly")?;
        if let Some(sample) = rx.borrow_and_update().clone() {
            println!("#{i} {}", render_sample(&sample));
        }
    }

    println!("{}", render_notice(&controller.stop_monitoring()));
    Ok(())
}

fn cmd_flow(controller: &PipelineController, output: OutputFormat) -> Result<()> {
    for notice in [
        controller.create_branch(),
        controller.open_pull_request(),
        controller.merge_pull_request(),
    ] {
        println!("{}", render_notice(&notice));
    }
    print_state(controller, output)
}

/// Run every action once, in dashboard order.
async fn cmd_demo(controller: &PipelineController, output: OutputFormat) -> Result<()> {
    println!("== Build");
    println!("{}", render_notice(&controller.build("// normal code").await));
    println!("{}", render_notice(&controller.build("has an error here").await));
    println!("{}", render_notice(&controller.build("// normal code").await));

    for environment in Environment::ALL {
        println!("== Deploy to {environment}");
        println!("{}", render_notice(&controller.deploy(environment).await));
        println!("== Test in {environment}");
        println!("{}", render_notice(&controller.test(environment).await));
    }

    println!("== Rollback production");
    println!(
        "{}",
        render_notice(&controller.rollback(Environment::Production).await)
    );

    println!("== Branch workflow");
    println!("{}", render_notice(&controller.merge_pull_request()));
    println!("{}", render_notice(&controller.create_branch()));
    println!("{}", render_notice(&controller.open_pull_request()));
    println!("{}", render_notice(&controller.merge_pull_request()));

    println!("== Monitoring");
    cmd_monitor(controller, 2).await?;

    println!("== Dashboard");
    print_state(controller, output)
}
