use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::ReturnHistory;
use crate::menv::ComputeProgress;

/// How the learning progress of an environment is estimated from its recent returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LpEstimator {
    /// Slope of the least-squares line through the last `K` returns
    Linreg,
    /// Mean of the newer half of the last `K` returns minus the mean of the older half
    Window,
    /// Exponential moving average of successive return differences, rate `1/K`
    Online,
}

/// How learning progress is turned into attention over environments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Attention {
    /// `|lp|`
    Lp,
    /// `|lp| + pot_coef * (max_return - recent_return)`
    LpPot { pot_coef: f64 },
    /// As [`LpPot`](Self::LpPot), but an environment gets no attention until the environment
    /// before it reaches `required_return` of its maximum return
    LpPotRr { pot_coef: f64, required_return: f64 },
}

/// Slope of the least-squares line through `points`, 0 if it is undefined
fn linreg_slope(points: impl Iterator<Item = (f64, f64)> + Clone) -> f64 {
    let n = points.clone().count() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let (sx, sy) = points
        .clone()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mx, my) = (sx / n, sy / n);
    let (cov, var) = points.fold((0.0, 0.0), |(cov, var), (x, y)| {
        (cov + (x - mx) * (y - my), var + (x - mx) * (x - mx))
    });
    if var == 0.0 {
        0.0
    } else {
        cov / var
    }
}

/// A [`ComputeProgress`] callback estimating the learning progress of every environment
///
/// The signal handed to the distribution callback is the attention vector, one entry per
/// environment.
#[derive(Debug, Clone)]
pub struct LearningProgress {
    estimator: LpEstimator,
    attention: Attention,
    history: ReturnHistory,
    lps: Vec<f64>,
    max_returns: Vec<f64>,
    episode: usize,
}

impl LearningProgress {
    /// Initialize with a window of `k` returns per environment
    ///
    /// **Panics** if `k` is zero
    pub fn new(estimator: LpEstimator, k: usize, num_envs: usize) -> Self {
        Self {
            estimator,
            attention: Attention::Lp,
            history: ReturnHistory::new(num_envs, k),
            lps: vec![0.0; num_envs],
            max_returns: vec![1.0; num_envs],
            episode: 0,
        }
    }

    pub fn with_attention(mut self, attention: Attention) -> Self {
        self.attention = attention;
        self
    }

    /// Maximum attainable return of each environment, 1 by default
    ///
    /// **Panics** if the length differs from the number of environments
    pub fn with_max_returns(mut self, max_returns: Vec<f64>) -> Self {
        assert_eq!(
            max_returns.len(),
            self.lps.len(),
            "One maximum return per environment is required."
        );
        self.max_returns = max_returns;
        self
    }

    /// Current learning-progress estimates
    pub fn lps(&self) -> &[f64] {
        &self.lps
    }

    pub fn history(&self) -> &ReturnHistory {
        &self.history
    }

    fn update_lp(&mut self, env: usize, ret: f64) {
        let k = self.history.capacity() as f64;
        let prev = self.history.last(env);
        self.history.push(env, self.episode, ret);
        let hist = self.history.get(env);

        self.lps[env] = match self.estimator {
            LpEstimator::Linreg => linreg_slope(hist.iter().map(|&(t, r)| (t as f64, r))),
            LpEstimator::Window => {
                if hist.len() < 2 {
                    0.0
                } else {
                    let half = hist.len() / 2;
                    let older = hist.iter().take(half).map(|&(_, r)| r).sum::<f64>() / half as f64;
                    let newer = hist.iter().skip(half).map(|&(_, r)| r).sum::<f64>()
                        / (hist.len() - half) as f64;
                    newer - older
                }
            }
            LpEstimator::Online => match prev {
                Some(prev) => {
                    let alpha = 1.0 / k;
                    (1.0 - alpha) * self.lps[env] + alpha * (ret - prev)
                }
                None => 0.0,
            },
        };
    }

    /// Attention of every environment from the current estimates
    pub fn attention(&self) -> Vec<f64> {
        let n = self.lps.len();
        let potential = |i: usize| (self.max_returns[i] - self.history.mean(i)).max(0.0);
        match self.attention {
            Attention::Lp => self.lps.iter().map(|lp| lp.abs()).collect(),
            Attention::LpPot { pot_coef } => (0..n)
                .map(|i| self.lps[i].abs() + pot_coef * potential(i))
                .collect(),
            Attention::LpPotRr {
                pot_coef,
                required_return,
            } => (0..n)
                .map(|i| {
                    let unlocked = i == 0
                        || self.history.mean(i - 1) >= required_return * self.max_returns[i - 1];
                    if unlocked {
                        self.lps[i].abs() + pot_coef * potential(i)
                    } else {
                        0.0
                    }
                })
                .collect(),
        }
    }
}

impl ComputeProgress for LearningProgress {
    fn compute_progress(&mut self, env_index: usize, episode_return: f64) -> Result<Vec<f64>> {
        ensure!(
            env_index < self.lps.len(),
            "environment {env_index} out of range for {} environments",
            self.lps.len()
        );
        self.update_lp(env_index, episode_return);
        self.episode += 1;
        Ok(self.attention())
    }
}
