use std::collections::VecDeque;

/// Bounded history of the returns obtained in each environment
///
/// Each entry is `(episode, return)`, where `episode` counts the episodes of the whole
/// meta-environment so the histories of different environments share a time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnHistory {
    capacity: usize,
    returns: Vec<VecDeque<(usize, f64)>>,
}

impl ReturnHistory {
    /// **Panics** if `capacity` is zero
    pub fn new(num_envs: usize, capacity: usize) -> Self {
        assert!(capacity > 0, "History capacity must be positive.");
        Self {
            capacity,
            returns: vec![VecDeque::with_capacity(capacity); num_envs],
        }
    }

    /// Append a return, dropping the oldest entry of the env once at capacity
    pub fn push(&mut self, env: usize, episode: usize, ret: f64) {
        let hist = &mut self.returns[env];
        if hist.len() == self.capacity {
            hist.pop_front();
        }
        hist.push_back((episode, ret));
    }

    pub fn get(&self, env: usize) -> &VecDeque<(usize, f64)> {
        &self.returns[env]
    }

    /// The last return obtained in `env`
    pub fn last(&self, env: usize) -> Option<f64> {
        self.returns[env].back().map(|&(_, r)| r)
    }

    /// The mean of the stored returns of `env`, 0 when empty
    pub fn mean(&self, env: usize) -> f64 {
        let hist = &self.returns[env];
        if hist.is_empty() {
            return 0.0;
        }
        hist.iter().map(|&(_, r)| r).sum::<f64>() / hist.len() as f64
    }

    pub fn num_envs(&self) -> usize {
        self.returns.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
