use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, NdArray};
use log::info;
use menv::{
    curriculum::{Attention, DistCreator, LearningProgress, LpEstimator},
    gym::{corridor::VIEW, Corridor, Move},
    menv::{CsvLogger, CurriculumPolicy, MetaEnv},
    preprocess::{ObssPreprocessor, PreprocessConfig},
    stats::LOG_FILE,
    storage::Storage,
};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, Rng, SeedableRng};

type Backend = NdArray;

static DEVICE: Lazy<NdArrayDevice> = Lazy::new(NdArrayDevice::default);

const NUM_EPISODES: usize = 500;
const LENGTHS: [usize; 4] = [3, 6, 10, 15];
const SEED: u64 = 1;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let storage = Storage::from_env();
    let run_dir = storage.model_dir(format!("corridor/seed{SEED}"));

    let envs = LENGTHS
        .iter()
        .map(|&len| Corridor::new(len, 4 * len))
        .collect::<Vec<_>>();
    let names = envs.iter().map(Corridor::name).collect::<Vec<_>>();

    let policy = CurriculumPolicy::adaptive(
        LearningProgress::new(LpEstimator::Linreg, 20, envs.len())
            .with_attention(Attention::LpPot { pot_coef: 0.001 }),
        DistCreator::greedy_prop(0.2),
    );
    let logger = CsvLogger::create(run_dir.join(LOG_FILE), &names)?;
    let mut menv =
        MetaEnv::with_rng(envs, policy, StdRng::seed_from_u64(SEED))?.with_logger(logger);

    let config = PreprocessConfig {
        image_shape: [1, VIEW, 3],
        ..Default::default()
    };
    let mut preprocessor = ObssPreprocessor::new(&run_dir, config)?;

    // A random walker that drifts right more often as it "learns"
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    let mut skill = 0.3;
    for _ in 0..NUM_EPISODES {
        let mut obs = menv.reset()?;
        loop {
            // A policy network would consume these tensors
            let _input = preprocessor.preprocess::<Backend>(std::slice::from_ref(&obs), &*DEVICE)?;
            let action = if rng.gen_bool(skill) {
                Move::Right
            } else {
                Move::random(&mut rng)
            };
            let step = menv.step(action)?;
            if step.done {
                break;
            }
            obs = step.obs;
        }
        skill = (skill + 0.001).min(0.9);
    }
    // Closes the last episode so that it reaches the log
    menv.reset()?;

    preprocessor.vocab().save()?;
    info!(
        "{} episodes, {} frames, final distribution {:?}",
        menv.episodes(),
        menv.frames(),
        menv.distribution()
    );
    info!("Training log written to {}", run_dir.join(LOG_FILE).display());

    Ok(())
}
