//! Submission of a grid of training runs, each with its own hyperparameters and seed.
use std::{
    process::{Child, Command},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

mod grid;

pub use grid::{ExperimentGrid, Job, SlurmOptions};

/// Starts jobs through the shell without waiting for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    delay: Duration,
    dry_run: bool,
}

impl Launcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            dry_run: false,
        }
    }

    /// Print the commands instead of running them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Submit every job, sleeping between two submissions
    ///
    /// Returns the number of submitted jobs. Stops at the first job that cannot be spawned.
    /// Submissions that exit during the loop are reaped. The ones still running on return are
    /// left to the system and reaped by it once the launcher exits.
    pub fn submit(&self, jobs: &[Job]) -> Result<usize> {
        let mut running = Vec::new();
        for (i, job) in jobs.iter().enumerate() {
            if self.dry_run {
                println!("{}", job.command);
                continue;
            }
            if i > 0 {
                thread::sleep(self.delay);
            }
            reap_finished(&mut running);
            let child = Command::new("sh")
                .arg("-c")
                .arg(&job.command)
                .spawn()
                .with_context(|| format!("failed to submit {}", job.model_name))?;
            info!("Submitted {}", job.model_name);
            running.push((job.model_name.as_str(), child));
        }
        reap_finished(&mut running);
        Ok(jobs.len())
    }
}

/// Collect the exit status of finished submissions and keep the running ones
fn reap_finished(running: &mut Vec<(&str, Child)>) {
    running.retain_mut(|(name, child)| match child.try_wait() {
        Ok(Some(status)) => {
            debug!("Submission of {name} exited with {status}");
            false
        }
        Ok(None) => true,
        Err(err) => {
            warn!("Cannot poll the submission of {name}: {err}");
            false
        }
    });
}
