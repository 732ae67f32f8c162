use std::{fs, path::PathBuf};

use anyhow::{bail, Result};
use log::info;

use super::{
    config::{AlgRuns, Stat, StatKind},
    extract_and_smooth, frames_to_reach, load_and_clean_logs, median_aggregate,
    percentile_aggregate,
    plot::{draw_panels, Line, Panel},
    shorten_env_name, Smoothed, TrainingLog,
};
use crate::storage::Storage;

/// Options shared by every statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsOptions {
    /// Size of the smoothing window
    ///
    /// **Default**: `100`
    pub window: usize,
    /// Return a curve has to reach in [`StatKind::FramesToReach`]
    ///
    /// **Default**: `0.8`
    pub return_to_reach: f64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            window: 100,
            return_to_reach: 0.8,
        }
    }
}

fn load(storage: &Storage, runs: &AlgRuns) -> Result<Vec<TrainingLog>> {
    Ok(load_and_clean_logs(
        storage.model_dir(&runs.folder),
        runs.max_frame,
    )?)
}

fn panel_for<'a>(panels: &'a mut Vec<(String, Panel)>, env: &str) -> &'a mut Panel {
    let i = match panels.iter().position(|(name, _)| name == env) {
        Some(i) => i,
        None => {
            panels.push((
                env.to_owned(),
                Panel {
                    title: shorten_env_name(env).to_owned(),
                    lines: Vec::new(),
                },
            ));
            panels.len() - 1
        }
    };
    &mut panels[i].1
}

fn return_comparison(
    algs: &[AlgRuns],
    storage: &Storage,
    options: &StatsOptions,
) -> Result<Vec<Panel>> {
    let mut panels = Vec::new();
    for alg in algs {
        let logs = load(storage, alg)?;
        let Smoothed { frames, envs } = extract_and_smooth(&logs, "return/", options.window)?;
        for series in envs {
            let mut agg = percentile_aggregate(&series.runs, &[25, 50, 75]).into_iter();
            let (Some(low), Some(median), Some(high)) = (agg.next(), agg.next(), agg.next()) else {
                continue;
            };
            panel_for(&mut panels, &series.env).lines.push(Line {
                label: alg.label.clone(),
                frames: frames.clone(),
                values: median,
                band: Some((low, high)),
            });
        }
    }
    Ok(panels.into_iter().map(|(_, panel)| panel).collect())
}

fn return_proba(
    runs: &AlgRuns,
    seeds: Option<[usize; 2]>,
    storage: &Storage,
    options: &StatsOptions,
) -> Result<Vec<Panel>> {
    let mut logs = load(storage, runs)?;
    if let Some([start, end]) = seeds {
        let end = end.min(logs.len());
        let start = start.min(end);
        logs = logs.drain(start..end).collect();
    }
    if logs.is_empty() {
        bail!("no run of {} left in the seed range {seeds:?}", runs.folder);
    }

    let returns = extract_and_smooth(&logs, "return/", options.window)?;
    let probas = extract_and_smooth(&logs, "proba/", options.window)?;
    let panels = returns
        .envs
        .iter()
        .map(|series| {
            let mut lines = vec![Line {
                label: String::from("Return"),
                frames: returns.frames.clone(),
                values: median_aggregate(&series.runs),
                band: None,
            }];
            if let Some(proba) = probas.envs.iter().find(|p| p.env == series.env) {
                lines.push(Line {
                    label: String::from("Proba"),
                    frames: probas.frames.clone(),
                    values: median_aggregate(&proba.runs),
                    band: None,
                });
            }
            Panel {
                title: shorten_env_name(&series.env).to_owned(),
                lines,
            }
        })
        .collect();
    Ok(panels)
}

fn frames_to_reach_table(
    algs: &[AlgRuns],
    storage: &Storage,
    options: &StatsOptions,
) -> Result<(Vec<String>, Vec<(String, Vec<Option<f64>>)>)> {
    let mut envs = Vec::<String>::new();
    let mut reached = Vec::new();
    for alg in algs {
        let logs = load(storage, alg)?;
        let smoothed = extract_and_smooth(&logs, "return/", options.window)?;
        let mut row = Vec::new();
        for series in smoothed.envs.iter() {
            let median = median_aggregate(&series.runs);
            let frames = frames_to_reach(&smoothed.frames, &median, options.return_to_reach);
            if !envs.contains(&series.env) {
                envs.push(series.env.clone());
            }
            row.push((series.env.clone(), frames));
        }
        reached.push((alg.label.clone(), row));
    }

    let rows = reached
        .into_iter()
        .map(|(label, row)| {
            let cells = envs
                .iter()
                .map(|env| {
                    row.iter()
                        .find(|(name, _)| name == env)
                        .and_then(|(_, frames)| *frames)
                })
                .collect();
            (label, cells)
        })
        .collect();
    Ok((envs, rows))
}

/// Compute a statistic and save it under the stats directory
///
/// Plots are saved as `<name>.png`, tables as `<name>.csv`. Returns the written path.
pub fn compute_stat(stat: &Stat, storage: &Storage, options: &StatsOptions) -> Result<PathBuf> {
    info!("> {}", stat.name);
    let stats_dir = storage.stats_dir();
    fs::create_dir_all(&stats_dir)?;

    let panels = match &stat.kind {
        StatKind::ReturnComparison { algs } => return_comparison(algs, storage, options)?,
        StatKind::ReturnProba { runs, seeds } => return_proba(runs, *seeds, storage, options)?,
        StatKind::FramesToReach { algs } => {
            let (envs, rows) = frames_to_reach_table(algs, storage, options)?;
            let path = stats_dir.join(format!("{}.csv", stat.name));
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(
                std::iter::once("alg").chain(envs.iter().map(|env| shorten_env_name(env))),
            )?;
            for (label, cells) in rows {
                info!("{label}: {cells:?}");
                writer.write_record(std::iter::once(label).chain(
                    cells
                        .into_iter()
                        .map(|frames| frames.map(|f| f.to_string()).unwrap_or_default()),
                ))?;
            }
            writer.flush()?;
            return Ok(path);
        }
    };

    let path = stats_dir.join(format!("{}.png", stat.name));
    draw_panels(&path, stat.grid, &panels)?;
    Ok(path)
}
