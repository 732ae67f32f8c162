//! The meta-environment: a curriculum over a fixed collection of environments.
//!
//! A [`MetaEnv`] looks like a single [`Environment`] to the training loop. Every call to
//! [`reset`](MetaEnv::reset) draws one of its sub-environments from a [`SamplingDistribution`],
//! and, when an adaptive [`CurriculumPolicy`] is used, the distribution is recomputed from the
//! return of the episode that just ended.
//!
//! ```ignore
//! let policy = CurriculumPolicy::adaptive(
//!     LearningProgress::new(LpEstimator::Linreg, 20, 3),
//!     DistCreator::GreedyProp { eps: 0.2 },
//! );
//! let mut menv = MetaEnv::new(envs, policy)?;
//! let mut obs = menv.reset()?;
//! loop {
//!     let step = menv.step(agent.act(&obs))?;
//!     obs = if step.done { menv.reset()? } else { step.obs };
//! }
//! ```
use anyhow::Result;
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    env::{Environment, Frame, RenderMode, Space, Spaces, Step},
    error::MenvError,
};

mod csv_logger;
mod distribution;
mod policy;

pub use csv_logger::CsvLogger;
pub use distribution::{SamplingDistribution, SUM_TOLERANCE};
pub use policy::{ComputeDistribution, ComputeProgress, CurriculumPolicy};

/// A summary of a completed episode, handed to an [`EpisodeLogger`]
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// Number of the episode, starting at 0
    pub episode: usize,
    /// Index of the sub-environment the episode was played in
    pub env_index: usize,
    /// Sum of the rewards of the episode
    pub episode_return: f64,
    /// Number of steps of the episode
    pub episode_len: usize,
    /// Total number of steps taken in the meta-environment so far
    pub frames: usize,
    /// The learning-progress signal computed from this episode, if the policy is adaptive
    pub progress: Option<Vec<f64>>,
    /// The sampling distribution that will be used for the next episode
    pub distribution: Vec<f64>,
}

/// Receives a summary of every completed episode
pub trait EpisodeLogger {
    fn log(&mut self, summary: &EpisodeSummary) -> Result<()>;
}

/// The episode in progress
#[derive(Debug, Clone, Copy)]
struct Episode {
    env_index: usize,
    ret: f64,
    len: usize,
}

/// A meta-environment that samples one of its sub-environments at every reset
///
/// ### Type parameters
/// - `E`: The sub-environment type, use `Box<dyn Environment<..>>` for heterogeneous collections
/// - `R`: The random source used to draw sub-environments
pub struct MetaEnv<E, R = StdRng>
where
    E: Environment,
    R: Rng,
{
    envs: Vec<E>,
    policy: CurriculumPolicy,
    distribution: SamplingDistribution,
    episode: Option<Episode>,
    episodes: usize,
    frames: usize,
    last_progress: Option<Vec<f64>>,
    logger: Option<Box<dyn EpisodeLogger>>,
    rng: R,
}

impl<E: Environment> MetaEnv<E, StdRng> {
    /// Initialize a meta-environment over `envs` with an entropy-seeded random source
    pub fn new(envs: Vec<E>, policy: CurriculumPolicy) -> Result<Self, MenvError> {
        Self::with_rng(envs, policy, StdRng::from_entropy())
    }
}

impl<E, R> MetaEnv<E, R>
where
    E: Environment,
    R: Rng,
{
    /// Initialize a meta-environment over `envs` drawing sub-environments with `rng`
    ///
    /// The sampling distribution starts uniform. No sub-environment is active until the first
    /// call to [`reset`](Self::reset).
    pub fn with_rng(envs: Vec<E>, policy: CurriculumPolicy, rng: R) -> Result<Self, MenvError> {
        if envs.is_empty() {
            return Err(MenvError::EmptyCollection);
        }
        let distribution = SamplingDistribution::uniform(envs.len());
        Ok(Self {
            envs,
            policy,
            distribution,
            episode: None,
            episodes: 0,
            frames: 0,
            last_progress: None,
            logger: None,
            rng,
        })
    }

    /// Attach a logger that receives a summary of every completed episode
    pub fn with_logger(mut self, logger: impl EpisodeLogger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    /// Start a new episode
    ///
    /// If an episode was in progress, it is considered complete: its return updates the sampling
    /// distribution (adaptive policy only) and its summary is logged. A sub-environment is then
    /// drawn from the distribution and reset.
    ///
    /// A completed episode is handed to the policy and the logger once, even if one of them
    /// fails. After a failed reset no sub-environment is active until the next successful one.
    ///
    /// **Returns** the initial observation of the selected sub-environment
    pub fn reset(&mut self) -> Result<E::Obs> {
        if let Some(episode) = self.episode.take() {
            self.finish_episode(episode)?;
        }

        let env_index = self.distribution.sample(&mut self.rng);
        let obs = self.envs[env_index].reset()?;
        self.episode = Some(Episode {
            env_index,
            ret: 0.0,
            len: 0,
        });

        Ok(obs)
    }

    /// Feed the return of `episode` to the policy and log the summary
    fn finish_episode(&mut self, episode: Episode) -> Result<()> {
        let Episode {
            env_index,
            ret,
            len,
        } = episode;
        debug!("episode {} in env {env_index}: return {ret}, length {len}", self.episodes);

        if let CurriculumPolicy::Adaptive {
            progress,
            distribution,
        } = &mut self.policy
        {
            let lp = progress.compute_progress(env_index, ret)?;
            let probs = distribution.compute_distribution(&lp)?;
            self.distribution = SamplingDistribution::try_new(probs, self.envs.len())?;
            self.last_progress = Some(lp);
            debug!("new distribution {:?}", self.distribution.probs());
        }

        if let Some(logger) = self.logger.as_mut() {
            logger.log(&EpisodeSummary {
                episode: self.episodes,
                env_index,
                episode_return: ret,
                episode_len: len,
                frames: self.frames,
                progress: self.last_progress.clone(),
                distribution: self.distribution.probs().to_vec(),
            })?;
        }

        self.episodes += 1;
        Ok(())
    }

    /// Apply `action` to the active sub-environment and accumulate its reward
    ///
    /// The `done` flag is returned as is, calling [`reset`](Self::reset) when an episode ends is
    /// the caller's responsibility.
    ///
    /// **Errors** with [`MenvError::NotReset`] if no sub-environment was selected yet
    pub fn step(&mut self, action: E::Action) -> Result<Step<E::Obs, E::Info>> {
        let episode = self.episode.as_mut().ok_or(MenvError::NotReset)?;
        let step = self.envs[episode.env_index].step(action)?;
        episode.ret += step.reward;
        episode.len += 1;
        self.frames += 1;
        Ok(step)
    }

    /// Render the active sub-environment
    pub fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>> {
        self.active_mut()?.render(mode)
    }

    /// Index of the active sub-environment
    pub fn active_index(&self) -> Result<usize, MenvError> {
        self.episode
            .map(|e| e.env_index)
            .ok_or(MenvError::NotReset)
    }

    /// The active sub-environment, looked up anew on every call
    pub fn active(&self) -> Result<&E, MenvError> {
        let i = self.active_index()?;
        Ok(&self.envs[i])
    }

    /// The active sub-environment, looked up anew on every call
    pub fn active_mut(&mut self) -> Result<&mut E, MenvError> {
        let i = self.active_index()?;
        Ok(&mut self.envs[i])
    }

    /// Forward an arbitrary query to the active sub-environment
    pub fn with_active<T>(&self, f: impl FnOnce(&E) -> T) -> Result<T, MenvError> {
        self.active().map(f)
    }

    /// The current sampling distribution
    pub fn distribution(&self) -> &[f64] {
        self.distribution.probs()
    }

    /// The last learning-progress signal, if the policy is adaptive and an episode completed
    pub fn last_progress(&self) -> Option<&[f64]> {
        self.last_progress.as_deref()
    }

    /// The return accumulated in the episode in progress
    pub fn episode_return(&self) -> Option<f64> {
        self.episode.map(|e| e.ret)
    }

    /// Number of completed episodes
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Number of steps taken across all episodes
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    pub fn envs(&self) -> &[E] {
        &self.envs
    }

    pub fn policy(&self) -> &CurriculumPolicy {
        &self.policy
    }

    /// Consume the meta-environment and return its sub-environments
    pub fn into_inner(self) -> Vec<E> {
        self.envs
    }
}

impl<E, R> MetaEnv<E, R>
where
    E: Environment + Spaces,
    R: Rng,
{
    /// Observation space of the active sub-environment
    pub fn observation_space(&self) -> Result<Space, MenvError> {
        self.with_active(|env| env.observation_space())
    }

    /// Action space of the active sub-environment
    pub fn action_space(&self) -> Result<Space, MenvError> {
        self.with_active(|env| env.action_space())
    }
}

impl<E, R> Environment for MetaEnv<E, R>
where
    E: Environment,
    R: Rng,
{
    type Obs = E::Obs;
    type Action = E::Action;
    type Info = E::Info;

    fn reset(&mut self) -> Result<Self::Obs> {
        MetaEnv::reset(self)
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Obs, Self::Info>> {
        MetaEnv::step(self, action)
    }

    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>> {
        MetaEnv::render(self, mode)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use anyhow::bail;
    use rand::rngs::mock::StepRng;

    use super::*;
    use crate::env::tests::MockEnv;

    fn mock_envs(n: usize) -> Vec<MockEnv> {
        (0..n).map(|i| MockEnv::new(i, vec![1.0, 2.0, 3.0])).collect()
    }

    fn seeded(n: usize, policy: CurriculumPolicy) -> MetaEnv<MockEnv> {
        MetaEnv::with_rng(mock_envs(n), policy, StdRng::seed_from_u64(42)).unwrap()
    }

    /// Shared record of every call made to the callbacks
    type Calls = Rc<RefCell<Vec<(usize, f64)>>>;

    /// A progress callback that records its inputs and a distribution callback that puts all the
    /// mass on the environment that was just played
    fn recording_policy(n: usize, calls: Calls) -> CurriculumPolicy {
        CurriculumPolicy::adaptive(
            move |i: usize, ret: f64| -> Result<Vec<f64>> {
                calls.borrow_mut().push((i, ret));
                let mut lp = vec![0.0; n];
                lp[i] = 1.0;
                Ok(lp)
            },
            |lp: &[f64]| -> Result<Vec<f64>> { Ok(lp.to_vec()) },
        )
    }

    #[test]
    fn empty_collection_rejected() {
        let res = MetaEnv::new(Vec::<MockEnv>::new(), CurriculumPolicy::StaticUniform);
        assert!(matches!(res, Err(MenvError::EmptyCollection)));
    }

    #[test]
    fn step_before_reset_fails() {
        let mut menv = seeded(2, CurriculumPolicy::StaticUniform);
        let err = menv.step(()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MenvError>(),
            Some(&MenvError::NotReset),
            "step before reset is a precondition violation"
        );
        assert!(menv.render(RenderMode::Ansi).is_err(), "render needs reset too");
        assert_eq!(menv.active_index(), Err(MenvError::NotReset));
    }

    #[test]
    fn static_uniform_never_updates() {
        for n in 1..=4 {
            let mut menv = seeded(n, CurriculumPolicy::StaticUniform);
            for _ in 0..50 {
                menv.reset().unwrap();
                menv.step(()).unwrap();
                assert!(
                    menv.distribution().iter().all(|&p| p == 1.0 / n as f64),
                    "distribution stays uniform"
                );
            }
            assert!(menv.last_progress().is_none(), "no progress computed");
        }
    }

    #[test]
    fn reset_returns_selected_observation() {
        let mut menv = seeded(5, CurriculumPolicy::StaticUniform);
        for _ in 0..20 {
            let obs = menv.reset().unwrap();
            let i = menv.active_index().unwrap();
            assert_eq!(obs, i, "observation comes from the selected env");
            assert!(i < 5, "index valid");
            assert_eq!(menv.active().unwrap().id, i, "active env matches index");
        }
    }

    #[test]
    fn uniform_frequencies_converge() {
        let mut menv = seeded(3, CurriculumPolicy::StaticUniform);
        let mut counts = [0usize; 3];
        for _ in 0..1000 {
            menv.reset().unwrap();
            counts[menv.active_index().unwrap()] += 1;
        }
        for (i, &c) in counts.iter().enumerate() {
            let freq = c as f64 / 1000.0;
            assert!(
                (freq - 1.0 / 3.0).abs() < 0.06,
                "env {i} drawn with frequency {freq}"
            );
        }
    }

    #[test]
    fn accumulator_sums_rewards_of_one_episode() {
        let calls = Calls::default();
        let mut menv = seeded(3, recording_policy(3, calls.clone()));

        menv.reset().unwrap();
        let first = menv.active_index().unwrap();
        menv.step(()).unwrap();
        menv.step(()).unwrap();
        assert_eq!(menv.episode_return(), Some(3.0), "1 + 2 accumulated");
        assert!(calls.borrow().is_empty(), "no progress before episode completes");

        menv.reset().unwrap();
        assert_eq!(menv.episode_return(), Some(0.0), "accumulator reset");
        let second = menv.active_index().unwrap();
        menv.step(()).unwrap();

        menv.reset().unwrap();
        assert_eq!(
            *calls.borrow(),
            vec![(first, 3.0), (second, 1.0)],
            "progress sees exactly the rewards of each episode"
        );
        assert_eq!(menv.episodes(), 2, "two episodes completed");
        assert_eq!(menv.frames(), 3, "three steps taken");
    }

    #[test]
    fn adaptive_update_drives_sampling() {
        let calls = Calls::default();
        let mut menv = seeded(4, recording_policy(4, calls));
        menv.reset().unwrap();
        let first = menv.active_index().unwrap();
        for _ in 0..10 {
            menv.reset().unwrap();
            assert_eq!(menv.distribution().len(), 4, "length preserved");
            let sum: f64 = menv.distribution().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "distribution sums to 1");
            assert_eq!(
                menv.active_index().unwrap(),
                first,
                "all mass stays on the first env"
            );
        }
        assert!(menv.last_progress().is_some(), "progress recorded");
    }

    #[test]
    fn single_env_always_selected() {
        let mut menv = seeded(
            1,
            CurriculumPolicy::adaptive(
                |_: usize, ret: f64| -> Result<Vec<f64>> { Ok(vec![ret]) },
                |_: &[f64]| -> Result<Vec<f64>> { Ok(vec![1.0]) },
            ),
        );
        for _ in 0..10 {
            menv.reset().unwrap();
            assert_eq!(menv.active_index().unwrap(), 0, "only env is selected");
            menv.step(()).unwrap();
        }
        assert_eq!(menv.distribution(), &[1.0], "distribution is [1.0]");
    }

    #[test]
    fn malformed_distribution_fails_fast() {
        let mut menv = seeded(
            2,
            CurriculumPolicy::adaptive(
                |_: usize, _: f64| -> Result<Vec<f64>> { Ok(vec![0.0, 0.0]) },
                |_: &[f64]| -> Result<Vec<f64>> { Ok(vec![0.3, 0.3, 0.4]) },
            ),
        );
        menv.reset().unwrap();
        let err = menv.reset().unwrap_err();
        assert_eq!(
            err.downcast_ref::<MenvError>(),
            Some(&MenvError::DistributionLength {
                expected: 2,
                actual: 3
            }),
        );
        assert_eq!(menv.distribution(), &[0.5, 0.5], "old distribution kept");
    }

    #[test]
    fn callback_errors_propagate_unchanged() {
        let mut menv = seeded(
            2,
            CurriculumPolicy::adaptive(
                |_: usize, _: f64| -> Result<Vec<f64>> { bail!("no progress today") },
                |lp: &[f64]| -> Result<Vec<f64>> { Ok(lp.to_vec()) },
            ),
        );
        menv.reset().unwrap();
        let err = menv.reset().unwrap_err();
        assert_eq!(err.to_string(), "no progress today");
    }

    #[test]
    fn failed_update_does_not_replay_episode() {
        let calls = Calls::default();
        let recorded = calls.clone();
        let mut fail = true;
        let mut menv = seeded(
            2,
            CurriculumPolicy::adaptive(
                move |i: usize, ret: f64| -> Result<Vec<f64>> {
                    recorded.borrow_mut().push((i, ret));
                    Ok(vec![1.0, 1.0])
                },
                move |_: &[f64]| -> Result<Vec<f64>> {
                    if std::mem::take(&mut fail) {
                        bail!("distribution unavailable");
                    }
                    Ok(vec![0.5, 0.5])
                },
            ),
        );
        menv.reset().unwrap();
        menv.step(()).unwrap();
        assert!(menv.reset().is_err(), "distribution error propagates");
        assert!(menv.step(()).is_err(), "no active env after a failed reset");

        menv.reset().unwrap();
        assert_eq!(calls.borrow().len(), 1, "episode fed to progress once");
        assert_eq!(menv.episodes(), 0, "failed episode not counted");
    }

    #[test]
    fn failed_env_reset_leaves_no_active_env() {
        let calls = Calls::default();
        let mut envs = mock_envs(1);
        envs[0].fail_reset = true;
        let mut menv =
            MetaEnv::with_rng(envs, recording_policy(1, calls.clone()), StepRng::new(0, 1))
                .unwrap();
        let err = menv.reset().unwrap_err();
        assert_eq!(err.to_string(), "mock env 0 failed to reset");
        assert_eq!(menv.active_index(), Err(MenvError::NotReset));
        assert!(menv.step(()).is_err(), "step needs a successful reset");

        assert!(menv.reset().is_err());
        assert!(calls.borrow().is_empty(), "no phantom episode reaches the policy");
        assert_eq!(menv.episodes(), 0);
    }

    #[test]
    fn env_errors_propagate_unchanged() {
        let mut envs = mock_envs(1);
        envs[0].fail_step = true;
        let mut menv =
            MetaEnv::with_rng(envs, CurriculumPolicy::StaticUniform, StepRng::new(0, 1)).unwrap();
        menv.reset().unwrap();
        let err = menv.step(()).unwrap_err();
        assert_eq!(err.to_string(), "mock env 0 failed");
        assert_eq!(menv.episode_return(), Some(0.0), "failed step not accumulated");
    }

    #[test]
    fn deterministic_rng_is_injected() {
        // StepRng(0, 0) always yields 0, which selects the first env with nonzero weight
        let mut menv =
            MetaEnv::with_rng(mock_envs(3), CurriculumPolicy::StaticUniform, StepRng::new(0, 0))
                .unwrap();
        for _ in 0..5 {
            menv.reset().unwrap();
            assert_eq!(menv.active_index().unwrap(), 0);
        }
    }

    #[test]
    fn forwarding_is_evaluated_per_access() {
        let mut menv = seeded(6, CurriculumPolicy::StaticUniform);
        assert_eq!(menv.observation_space(), Err(MenvError::NotReset));
        for _ in 0..10 {
            menv.reset().unwrap();
            let i = menv.active_index().unwrap();
            assert_eq!(
                menv.observation_space().unwrap(),
                Space::Discrete(i + 1),
                "space of the active env"
            );
            assert_eq!(menv.with_active(|env| env.id).unwrap(), i);
        }
    }

    #[test]
    fn render_delegates() {
        let mut menv = seeded(2, CurriculumPolicy::StaticUniform);
        menv.reset().unwrap();
        let i = menv.active_index().unwrap();
        menv.step(()).unwrap();
        assert_eq!(
            menv.render(RenderMode::Ansi).unwrap(),
            Some(Frame::Text(format!("env {i} t=1")))
        );
    }

    struct SharedLogger(Rc<RefCell<Vec<EpisodeSummary>>>);

    impl EpisodeLogger for SharedLogger {
        fn log(&mut self, summary: &EpisodeSummary) -> Result<()> {
            self.0.borrow_mut().push(summary.clone());
            Ok(())
        }
    }

    #[test]
    fn logger_receives_summaries() {
        let summaries = Rc::new(RefCell::new(Vec::new()));
        let mut menv = seeded(2, CurriculumPolicy::StaticUniform)
            .with_logger(SharedLogger(summaries.clone()));
        menv.reset().unwrap();
        let i = menv.active_index().unwrap();
        menv.step(()).unwrap();
        menv.step(()).unwrap();
        menv.reset().unwrap();

        let summaries = summaries.borrow();
        assert_eq!(summaries.len(), 1, "one completed episode");
        assert_eq!(
            summaries[0],
            EpisodeSummary {
                episode: 0,
                env_index: i,
                episode_return: 3.0,
                episode_len: 2,
                frames: 2,
                progress: None,
                distribution: vec![0.5, 0.5],
            }
        );
    }

    #[test]
    fn meta_env_is_an_environment() {
        fn run<E: Environment<Action = ()>>(env: &mut E) -> f64 {
            env.reset().unwrap();
            let mut ret = 0.0;
            loop {
                let step = env.step(()).unwrap();
                ret += step.reward;
                if step.done {
                    return ret;
                }
            }
        }
        let mut menv = seeded(3, CurriculumPolicy::StaticUniform);
        assert_eq!(run(&mut menv), 6.0, "full episode through the trait");
    }
}
