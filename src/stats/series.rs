use statrs::statistics::{Data, Median, OrderStatistics};

use super::TrainingLog;
use crate::{error::StatsError, util::transpose};

/// The runs of one environment for one column family
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSeries {
    /// Column name without its prefix
    pub env: String,
    /// One series per training log
    pub runs: Vec<Vec<f64>>,
}

/// Smoothed columns of a group of aligned training logs
#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    /// Frame counts of the first log
    pub frames: Vec<f64>,
    /// Environments in the column order of the logs
    pub envs: Vec<EnvSeries>,
}

/// Trailing rolling mean over `window` values, ignoring `NaN`
///
/// A position whose window holds no number at all is `NaN`.
///
/// **Panics** if `window` is zero
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window > 0, "Rolling window must be positive.");
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = values[start..=i]
                .iter()
                .filter(|value| !value.is_nan())
                .fold((0.0_f64, 0usize), |(sum, count), value| (sum + value, count + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Extract every column starting with `prefix`, group them by environment and smooth them
pub fn extract_and_smooth(
    logs: &[TrainingLog],
    prefix: &str,
    window: usize,
) -> Result<Smoothed, StatsError> {
    let frames = logs
        .first()
        .map(|log| log.frames().map(<[f64]>::to_vec))
        .transpose()?
        .unwrap_or_default();

    let mut envs = Vec::<EnvSeries>::new();
    for log in logs {
        for (env, column) in log.columns_with_prefix(prefix) {
            let smoothed = rolling_mean(column, window);
            match envs.iter_mut().find(|series| series.env == env) {
                Some(series) => series.runs.push(smoothed),
                None => envs.push(EnvSeries {
                    env: env.to_owned(),
                    runs: vec![smoothed],
                }),
            }
        }
    }

    Ok(Smoothed { frames, envs })
}

/// Percentiles across runs at every time index, one series per requested percentile
pub fn percentile_aggregate(runs: &[Vec<f64>], percentiles: &[usize]) -> Vec<Vec<f64>> {
    if runs.is_empty() {
        return vec![Vec::new(); percentiles.len()];
    }
    let columns = transpose(runs.to_vec());
    percentiles
        .iter()
        .map(|&p| {
            columns
                .iter()
                .map(|column| Data::new(column.clone()).percentile(p))
                .collect()
        })
        .collect()
}

/// Median across runs at every time index
pub fn median_aggregate(runs: &[Vec<f64>]) -> Vec<f64> {
    if runs.is_empty() {
        return Vec::new();
    }
    transpose(runs.to_vec())
        .into_iter()
        .map(|column| Data::new(column).median())
        .collect()
}
