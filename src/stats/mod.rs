//! Aggregation and plotting of the training logs of many runs.
//!
//! Every run directory holds a `log.csv` written by a [`CsvLogger`](crate::menv::CsvLogger).
//! Logs of the runs of one algorithm are loaded and aligned with [`load_and_clean_logs`],
//! smoothed with [`extract_and_smooth`], aggregated across seeds and drawn by
//! [`compute_stat`].
mod config;
mod logs;
mod plot;
mod report;
mod series;

pub use config::{AlgRuns, Stat, StatKind, StatsConfig};
pub use logs::{find_logs, load_and_clean_logs, TrainingLog, LOG_FILE};
pub use plot::{draw_panels, Line, Panel};
pub use report::{compute_stat, StatsOptions};
pub use series::{
    extract_and_smooth, median_aggregate, percentile_aggregate, rolling_mean, EnvSeries,
    Smoothed,
};

/// Strip the `MiniGrid-` prefix and the `-v0` suffix of an environment name
pub fn shorten_env_name(env_name: &str) -> &str {
    let name = env_name.strip_prefix("MiniGrid-").unwrap_or(env_name);
    name.strip_suffix("-v0").unwrap_or(name)
}

/// Frame count at the first index where `series` reaches `threshold`
pub fn frames_to_reach(frames: &[f64], series: &[f64], threshold: f64) -> Option<f64> {
    frames
        .iter()
        .zip(series)
        .find(|(_, value)| **value >= threshold)
        .map(|(&frame, _)| frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_env_name_functional() {
        assert_eq!(
            shorten_env_name("MiniGrid-BlockedUnlockPickup-v0"),
            "BlockedUnlockPickup"
        );
        assert_eq!(shorten_env_name("KeyCorridorS3R1"), "KeyCorridorS3R1");
        assert_eq!(shorten_env_name("MiniGrid-v0"), "v0", "prefix stripped first");
    }

    #[test]
    fn frames_to_reach_functional() {
        let frames = [100.0, 200.0, 300.0];
        assert_eq!(frames_to_reach(&frames, &[0.1, 0.8, 0.9], 0.8), Some(200.0));
        assert_eq!(frames_to_reach(&frames, &[0.1, f64::NAN, 0.5], 0.8), None);
    }
}
