use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::{assert_interval, menv::ComputeDistribution};

/// Turns attention over environments into a sampling distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistCreator {
    /// `eps/N` on every environment plus `1 - eps` on the one with the highest attention
    GreedyAmax { eps: f64 },
    /// `eps/N` on every environment plus `1 - eps` shared in proportion to attention
    GreedyProp { eps: f64 },
    /// Softmax of attention with temperature `tau`
    Boltzmann { tau: f64 },
}

impl DistCreator {
    /// **Panics** if `eps` is not in the interval `[0,1]`
    pub fn greedy_amax(eps: f64) -> Self {
        assert_interval!(eps, 0.0, 1.0);
        Self::GreedyAmax { eps }
    }

    /// **Panics** if `eps` is not in the interval `[0,1]`
    pub fn greedy_prop(eps: f64) -> Self {
        assert_interval!(eps, 0.0, 1.0);
        Self::GreedyProp { eps }
    }

    /// **Panics** if `tau` is not positive
    pub fn boltzmann(tau: f64) -> Self {
        assert!(tau > 0.0, "Boltzmann temperature must be positive.");
        Self::Boltzmann { tau }
    }

    /// Compute the distribution for the given attention vector
    pub fn distribution(&self, attention: &[f64]) -> Vec<f64> {
        let n = attention.len() as f64;
        match *self {
            Self::GreedyAmax { eps } => {
                let best = attention
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map(|(i, _)| i);
                let mut dist = vec![eps / n; attention.len()];
                if let Some(best) = best {
                    dist[best] += 1.0 - eps;
                }
                dist
            }
            Self::GreedyProp { eps } => {
                let sum: f64 = attention.iter().sum();
                if sum <= 0.0 {
                    return vec![1.0 / n; attention.len()];
                }
                attention
                    .iter()
                    .map(|a| eps / n + (1.0 - eps) * a / sum)
                    .collect()
            }
            Self::Boltzmann { tau } => {
                let max = attention.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let exponentials = attention.iter().map(|a| ((a - max) / tau).exp());
                let sum: f64 = exponentials.clone().sum();
                exponentials.map(|x| x / sum).collect()
            }
        }
    }
}

impl ComputeDistribution for DistCreator {
    fn compute_distribution(&mut self, progress: &[f64]) -> Result<Vec<f64>> {
        ensure!(!progress.is_empty(), "attention vector is empty");
        ensure!(
            progress.iter().all(|a| a.is_finite() && *a >= 0.0),
            "attention must be finite and non-negative, got {progress:?}"
        );
        Ok(self.distribution(progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_normalized(dist: &[f64]) {
        let sum: f64 = dist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "distribution {dist:?} sums to 1");
    }

    #[test]
    fn greedy_amax_functional() {
        let dist = DistCreator::greedy_amax(0.2).distribution(&[0.1, 0.5, 0.3, 0.1]);
        assert_normalized(&dist);
        assert!((dist[1] - 0.85).abs() < 1e-12, "best env gets 1 - eps + eps/N");
        assert!((dist[0] - 0.05).abs() < 1e-12, "others get eps/N");
    }

    #[test]
    fn greedy_prop_functional() {
        let dist = DistCreator::greedy_prop(0.0).distribution(&[1.0, 3.0]);
        assert_eq!(dist, vec![0.25, 0.75], "proportional to attention");

        let dist = DistCreator::greedy_prop(0.5).distribution(&[0.0, 0.0, 0.0]);
        assert_eq!(dist, vec![1.0 / 3.0; 3], "uniform without attention");

        let dist = DistCreator::greedy_prop(0.2).distribution(&[0.2, 0.0]);
        assert_normalized(&dist);
        assert!((dist[1] - 0.1).abs() < 1e-12, "exploration mass only");
    }

    #[test]
    fn boltzmann_functional() {
        let dist = DistCreator::boltzmann(1.0).distribution(&[1.0, 1.0]);
        assert_eq!(dist, vec![0.5, 0.5], "equal attention, equal probability");

        let dist = DistCreator::boltzmann(0.1).distribution(&[0.0, 1.0, 1000.0]);
        assert_normalized(&dist);
        assert!(dist[2] > 0.999, "stable with large attention");
    }

    #[test]
    fn single_env_distribution() {
        for mut creator in [
            DistCreator::greedy_amax(0.3),
            DistCreator::greedy_prop(0.3),
            DistCreator::boltzmann(2.0),
        ] {
            let dist = creator.compute_distribution(&[0.7]).unwrap();
            assert_eq!(dist.len(), 1, "length 1");
            assert!((dist[0] - 1.0).abs() < 1e-12, "{creator:?} gives [1.0]");
        }
    }

    #[test]
    fn invalid_attention_rejected() {
        let mut creator = DistCreator::greedy_prop(0.1);
        assert!(creator.compute_distribution(&[]).is_err());
        assert!(creator.compute_distribution(&[-1.0, 2.0]).is_err());
    }

    #[test]
    #[should_panic]
    fn eps_out_of_interval() {
        DistCreator::greedy_amax(1.5);
    }
}
