mod demo;
mod experiment;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "fitchain",
    about = "Fit, evaluate and compare classification pipelines",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an experiment file and compare its pipelines
    Run {
        /// Path to the experiment JSON
        #[arg(long, short)]
        config: PathBuf,
        /// Print results as JSON instead of tables
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Walk through scaler -> PCA -> classifier on Iris
    Demo,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Run { config, json } => {
            info!(?config, json, "starting experiment");
            let experiment = experiment::ExperimentConfig::from_file(&config)?;
            let base_dir = config.parent().unwrap_or(Path::new("."));
            let result = experiment::run(&experiment, base_dir)?;
            if json {
                let text =
                    serde_json::to_string_pretty(&result).context("failed to serialize results")?;
                println!("{}", text);
            } else {
                print!("{}", result);
            }
        }
        Commands::Demo => {
            print!("{}", demo::render()?);
        }
    }
    Ok(())
}
