use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use pinn_export::{config::Config, pipeline};

const DEFAULT_CONFIG: &str = "config.json";

/// Train a Black-Scholes PINN, export its weights and verify the export
#[derive(Parser, Debug)]
#[command(name = "pinn-export", version, about)]
struct Args {
    /// Path to the JSON config [default: config.json, built-in defaults if it doesn't exist]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reuse the checkpoint at `model_path` instead of training
    #[arg(long)]
    skip_training: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let config = match args.config {
        Some(path) => load(&path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => load(Path::new(DEFAULT_CONFIG))?,
        None => {
            info!("no {DEFAULT_CONFIG} found, using the default config");
            Config::default()
        }
    };

    let report = pipeline::run(&config, args.skip_training).context("export pipeline failed")?;
    Ok(report.passed())
}

fn load(path: &Path) -> Result<Config> {
    let config = Config::load(path)
        .with_context(|| format!("failed to load config: {}", path.display()))?;
    info!("loaded config from {}", path.display());
    Ok(config)
}
