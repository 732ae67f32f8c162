use anyhow::Result;

/// Computes a learning-progress signal from the return of a completed episode
///
/// Implemented for closures `FnMut(usize, f64) -> Result<Vec<f64>>` taking the index of the
/// environment that was played and the episode return.
pub trait ComputeProgress {
    fn compute_progress(&mut self, env_index: usize, episode_return: f64) -> Result<Vec<f64>>;
}

impl<F> ComputeProgress for F
where
    F: FnMut(usize, f64) -> Result<Vec<f64>>,
{
    fn compute_progress(&mut self, env_index: usize, episode_return: f64) -> Result<Vec<f64>> {
        self(env_index, episode_return)
    }
}

/// Computes the next sampling distribution from a learning-progress signal
///
/// Implemented for closures `FnMut(&[f64]) -> Result<Vec<f64>>`.
pub trait ComputeDistribution {
    fn compute_distribution(&mut self, progress: &[f64]) -> Result<Vec<f64>>;
}

impl<F> ComputeDistribution for F
where
    F: FnMut(&[f64]) -> Result<Vec<f64>>,
{
    fn compute_distribution(&mut self, progress: &[f64]) -> Result<Vec<f64>> {
        self(progress)
    }
}

/// How a [`MetaEnv`](super::MetaEnv) updates its sampling distribution between episodes
pub enum CurriculumPolicy {
    /// Never update, environments are drawn uniformly forever
    StaticUniform,
    /// After every completed episode, feed the return to `progress`, then feed the progress
    /// signal to `distribution` to get the next sampling distribution
    Adaptive {
        progress: Box<dyn ComputeProgress>,
        distribution: Box<dyn ComputeDistribution>,
    },
}

impl CurriculumPolicy {
    /// Build an [`Adaptive`](Self::Adaptive) policy from a pair of callbacks
    pub fn adaptive<P, D>(progress: P, distribution: D) -> Self
    where
        P: ComputeProgress + 'static,
        D: ComputeDistribution + 'static,
    {
        Self::Adaptive {
            progress: Box::new(progress),
            distribution: Box::new(distribution),
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Adaptive { .. })
    }
}

impl Default for CurriculumPolicy {
    fn default() -> Self {
        Self::StaticUniform
    }
}

impl std::fmt::Debug for CurriculumPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaticUniform => f.write_str("StaticUniform"),
            Self::Adaptive { .. } => f.write_str("Adaptive"),
        }
    }
}
