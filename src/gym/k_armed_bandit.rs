use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::env::{Environment, Space, Spaces, Step};

/// K-armed bandit environment
///
/// A simple environment with K arms, each of which has a normal distribution of rewards with
/// unit variance. An episode lasts a fixed number of pulls.
pub struct KArmedBandit<const K: usize> {
    means: [f64; K],
    steps: usize,
    t: usize,
    rewards: Vec<f64>,
    rng: StdRng,
}

impl<const K: usize> KArmedBandit<K> {
    /// Initialize a new K-armed bandit environment with episodes of `steps` pulls
    pub fn new(steps: usize) -> Self {
        Self::with_rng(steps, StdRng::from_entropy())
    }

    /// Initialize with a seeded generator, for reproducible arms and rewards
    pub fn with_seed(steps: usize, seed: u64) -> Self {
        Self::with_rng(steps, StdRng::seed_from_u64(seed))
    }

    fn with_rng(steps: usize, mut rng: StdRng) -> Self {
        let means = std::array::from_fn(|_| rng.sample(StandardNormal));
        Self {
            means,
            steps,
            t: 0,
            rewards: Vec::with_capacity(steps),
            rng,
        }
    }

    /// Mean reward of every arm
    pub fn means(&self) -> &[f64; K] {
        &self.means
    }

    /// Rewards received since the last call
    pub fn take_rewards(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.rewards)
    }
}

impl<const K: usize> Environment for KArmedBandit<K> {
    type Obs = ();
    type Action = usize;
    type Info = ();

    fn reset(&mut self) -> Result<Self::Obs> {
        self.t = 0;
        Ok(())
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Obs, Self::Info>> {
        ensure!(action < K, "Invalid action: {}", action);
        let noise: f64 = self.rng.sample(StandardNormal);
        let reward = self.means[action] + noise;
        self.t += 1;
        self.rewards.push(reward);
        Ok(Step::new((), reward, self.t >= self.steps, ()))
    }
}

impl<const K: usize> Spaces for KArmedBandit<K> {
    fn observation_space(&self) -> Space {
        Space::Discrete(1)
    }

    fn action_space(&self) -> Space {
        Space::Discrete(K)
    }
}
