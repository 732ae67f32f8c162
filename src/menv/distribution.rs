use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use crate::error::MenvError;

/// Largest accepted deviation of the sum of a distribution from 1
pub const SUM_TOLERANCE: f64 = 1e-6;

/// A probability distribution over the indices `0..n` of a collection of environments
#[derive(Debug, Clone)]
pub struct SamplingDistribution {
    probs: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl SamplingDistribution {
    /// The uniform distribution `1/n` over `n` indices
    ///
    /// **Panics** if `n` is zero
    pub fn uniform(n: usize) -> Self {
        assert!(n > 0, "A distribution needs at least one entry.");
        let probs = vec![1.0 / n as f64; n];
        let index = WeightedIndex::new(&probs).expect("uniform weights are positive");
        Self { probs, index }
    }

    /// Validate `probs` as a distribution over `n` indices
    ///
    /// Every entry must be finite and non-negative and the entries must sum to 1 within
    /// [`SUM_TOLERANCE`].
    pub fn try_new(probs: Vec<f64>, n: usize) -> Result<Self, MenvError> {
        if probs.len() != n {
            return Err(MenvError::DistributionLength {
                expected: n,
                actual: probs.len(),
            });
        }
        if let Some((i, p)) = probs
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(MenvError::InvalidDistribution {
                reason: format!("entry {i} is {p}"),
            });
        }
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(MenvError::InvalidDistribution {
                reason: format!("entries sum to {sum}"),
            });
        }
        let index = WeightedIndex::new(&probs).map_err(|e| MenvError::InvalidDistribution {
            reason: e.to_string(),
        })?;
        Ok(Self { probs, index })
    }

    /// Draw an index with probability `probs[i]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

impl PartialEq for SamplingDistribution {
    fn eq(&self, other: &Self) -> bool {
        self.probs == other.probs
    }
}
