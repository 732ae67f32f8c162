/// Stock curriculum callbacks: learning progress and distribution creators
pub mod curriculum;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Experiment launcher
pub mod launch;

/// Meta-environment
pub mod menv;

/// Observation preprocessing
pub mod preprocess;

/// Training log aggregation and plotting
pub mod stats;

/// Storage layout
pub mod storage;

/// Instruction vocabulary
pub mod vocab;

/// Testing environments
#[cfg(feature = "gym")]
pub mod gym;

mod util;
