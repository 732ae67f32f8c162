use std::{fs::File, io::Write, path::Path};

use anyhow::{ensure, Result};

use super::{EpisodeLogger, EpisodeSummary};
use crate::storage::create_folders_if_necessary;

/// Writes one row per completed episode to a training log in CSV format
///
/// The header is `frames,episode,return/<env>...,proba/<env>...`. The `return/` cell of the
/// environment that was played holds the episode return, the others are left empty. The
/// `proba/` cells hold the sampling distribution for the next episode.
pub struct CsvLogger<W: Write = File> {
    writer: csv::Writer<W>,
    num_envs: usize,
}

impl CsvLogger<File> {
    /// Create (or truncate) the log file at `path`, creating missing folders
    pub fn create(path: impl AsRef<Path>, env_names: &[String]) -> Result<Self> {
        let path = path.as_ref();
        create_folders_if_necessary(path)?;
        Self::from_writer(File::create(path)?, env_names)
    }
}

impl<W: Write> CsvLogger<W> {
    /// Wrap `writer` and write the header row
    pub fn from_writer(writer: W, env_names: &[String]) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        let header = ["frames", "episode"]
            .into_iter()
            .map(String::from)
            .chain(env_names.iter().map(|name| format!("return/{name}")))
            .chain(env_names.iter().map(|name| format!("proba/{name}")));
        writer.write_record(header)?;
        writer.flush()?;
        Ok(Self {
            writer,
            num_envs: env_names.len(),
        })
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush training log: {}", e.error()))
    }
}

impl<W: Write> EpisodeLogger for CsvLogger<W> {
    fn log(&mut self, summary: &EpisodeSummary) -> Result<()> {
        ensure!(
            summary.distribution.len() == self.num_envs,
            "training log has {} environments, got a distribution over {}",
            self.num_envs,
            summary.distribution.len()
        );

        let mut row = Vec::with_capacity(2 + 2 * self.num_envs);
        row.push(summary.frames.to_string());
        row.push(summary.episode.to_string());
        row.extend((0..self.num_envs).map(|i| {
            if i == summary.env_index {
                summary.episode_return.to_string()
            } else {
                String::new()
            }
        }));
        row.extend(summary.distribution.iter().map(f64::to_string));
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        Ok(())
    }
}
