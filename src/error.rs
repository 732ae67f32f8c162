//! Error types of the library.
use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised by the [`MetaEnv`](crate::menv::MetaEnv) itself
///
/// Errors raised by sub-environments or by curriculum callbacks are never wrapped in this type,
/// they are propagated to the caller as they were returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MenvError {
    /// `step`, `render` or an active-environment accessor was called before the first `reset`
    #[error("No active environment, `reset` must be called before `step` or `render`")]
    NotReset,

    /// The meta-environment was built from an empty collection of environments
    #[error("A meta-environment needs at least one sub-environment")]
    EmptyCollection,

    /// A distribution has the wrong number of entries
    #[error("Distribution has {actual} entries, expected {expected}")]
    DistributionLength { expected: usize, actual: usize },

    /// A distribution has a negative or non-finite entry, or does not sum to 1
    #[error("Invalid distribution: {reason}")]
    InvalidDistribution { reason: String },
}

/// Errors raised by the [`Vocabulary`](crate::vocab::Vocabulary)
#[derive(Error, Debug)]
pub enum VocabError {
    /// An unseen token was requested but the vocabulary is full
    #[error("Maximum vocabulary capacity reached ({max_size} tokens)")]
    CapacityExceeded { max_size: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the [`ObssPreprocessor`](crate::preprocess::ObssPreprocessor)
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error(transparent)]
    Vocab(#[from] VocabError),

    /// An image does not have the shape configured for the batch
    #[error("Image of shape {actual:?} does not match the expected shape {expected:?}")]
    ImageShape {
        expected: [usize; 3],
        actual: [usize; 3],
    },
}

/// Errors raised while loading and aggregating training logs
#[derive(Error, Debug)]
pub enum StatsError {
    /// No `log.csv` file was found under the given directory
    #[error("No training log found under {0}")]
    NoLogs(PathBuf),

    /// A required column is absent from a training log
    #[error("Column `{column}` not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A cell holds neither a number nor `nan`
    #[error("Invalid value `{value}` in {path}")]
    Parse { value: String, path: PathBuf },

    /// Alignment left no rows to aggregate
    #[error("Training logs have no rows in common")]
    EmptyAlignment,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

/// Errors raised while expanding an experiment grid
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A curriculum has no entry in one of the per-curriculum tables
    #[error("Curriculum `{curriculum}` has no entry in `{table}`")]
    UnknownCurriculum { curriculum: String, table: String },
}
