use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::info;
use menv::launch::{ExperimentGrid, Launcher};

/// Submit one training run per combination of an experiment grid
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Run the commands directly instead of through sbatch
    #[arg(long, default_value_t = false)]
    no_slurm: bool,

    /// Print the commands without running them
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// YAML experiment grid, the built-in grid if absent
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let grid = match &args.config {
        Some(path) => ExperimentGrid::load(path)?,
        None => ExperimentGrid::default(),
    };
    let jobs = grid.jobs(!args.no_slurm)?;
    info!("{} jobs in the grid", jobs.len());

    let launcher = Launcher::new(Duration::from_secs_f64(grid.delay_secs.max(0.0)))
        .dry_run(args.dry_run);
    let submitted = launcher.submit(&jobs)?;
    info!("{} jobs submitted", submitted);

    Ok(())
}
