use std::{path::PathBuf, process::Command};

use anyhow::{bail, Result};
use clap::Parser;
use log::{error, info};
use menv::{
    stats::{compute_stat, StatsConfig, StatsOptions},
    storage::Storage,
};

/// Aggregate the training logs of many runs into plots and tables
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Compute only this statistic, and open the result
    #[arg(long)]
    stat: Option<String>,

    /// Number of time-steps to average on
    #[arg(long, default_value_t = 100)]
    window: usize,

    /// Return to reach, used by frames-to-reach statistics
    #[arg(long, default_value_t = 0.8)]
    return_to_reach: f64,

    /// YAML list of statistics, the built-in list if absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage root, `MENV_STORAGE` or `storage` if absent
    #[arg(long)]
    storage: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StatsConfig::load(path)?,
        None => StatsConfig::default(),
    };
    let storage = match &args.storage {
        Some(root) => Storage::new(root),
        None => Storage::from_env(),
    };
    let options = StatsOptions {
        window: args.window.max(1),
        return_to_reach: args.return_to_reach,
    };

    match &args.stat {
        Some(name) => {
            let Some(stat) = config.get(name) else {
                bail!("unknown statistic `{name}`");
            };
            let path = compute_stat(stat, &storage, &options)?;
            info!("Saved {}", path.display());
            Command::new("xdg-open").arg(&path).output()?;
        }
        None => {
            for stat in config.stats.iter() {
                match compute_stat(stat, &storage, &options) {
                    Ok(path) => info!("Saved {}", path.display()),
                    Err(e) => error!("{}: {:#}", stat.name, e),
                }
            }
        }
    }

    Ok(())
}
