//! Conversion of raw multimodal observations into tensors for a policy network.
use std::path::Path;

use burn::tensor::{backend::Backend, Int, Tensor};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{PreprocessError, VocabError},
    vocab::Vocabulary,
};

mod tensor;

pub use tensor::{InstrBatch, ToTensor};

/// An `h x w x c` image stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
}

impl Image {
    /// **Panics** if `data` does not hold exactly `h * w * c` values
    pub fn new(data: Vec<f32>, shape: [usize; 3]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "Image data does not match its shape."
        );
        Self { data, shape }
    }

    /// An image filled with zeros
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            data: vec![0.0; shape.iter().product()],
            shape,
        }
    }
}

/// A raw observation: a partial view of the grid and a textual mission
#[derive(Debug, Clone, PartialEq)]
pub struct Obs {
    pub image: Image,
    pub mission: String,
}

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new("[a-z]+").expect("Invalid token regex"));

/// Split a mission into lowercase alphabetic tokens
pub fn tokenize(mission: &str) -> Vec<String> {
    TOKEN
        .find_iter(&mission.to_lowercase())
        .map(|token| token.as_str().to_owned())
        .collect()
}

/// Scale a sparse environment reward
pub fn reshape_reward(reward: f64) -> f64 {
    20.0 * reward
}

/// Which parts of an observation are fed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    /// Convert images
    ///
    /// **Default**: `true`
    pub image: bool,
    /// Convert missions to instruction ids
    ///
    /// **Default**: `true`
    pub instr: bool,
    /// Shape every image must have
    ///
    /// **Default**: `[7, 7, 3]`
    pub image_shape: [usize; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image: true,
            instr: true,
            image_shape: [7, 7, 3],
        }
    }
}

/// Sizes of the inputs the model has to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObsSpace {
    /// Number of values of an image
    pub image: Option<usize>,
    /// Number of distinct instruction tokens
    pub instr: Option<usize>,
}

/// A batch of preprocessed observations
#[derive(Debug, Clone)]
pub struct PreprocessedObss<B: Backend> {
    /// `[n, h, w, c]`
    pub image: Option<Tensor<B, 4>>,
    /// `[n, longest instruction]`, zero-padded
    pub instr: Option<Tensor<B, 2, Int>>,
}

/// Converts lists of observations into the tensors a model consumes
///
/// Images are stacked as they are. Missions are tokenized, tokens are mapped to ids with a
/// [`Vocabulary`], and the id lists are zero-padded and stacked.
#[derive(Debug, Clone)]
pub struct ObssPreprocessor {
    vocab: Vocabulary,
    config: PreprocessConfig,
}

impl ObssPreprocessor {
    /// Initialize with the vocabulary of `run_dir`
    pub fn new(run_dir: impl AsRef<Path>, config: PreprocessConfig) -> Result<Self, VocabError> {
        Ok(Self {
            vocab: Vocabulary::open(run_dir)?,
            config,
        })
    }

    /// Initialize with an existing vocabulary
    pub fn with_vocab(vocab: Vocabulary, config: PreprocessConfig) -> Self {
        Self { vocab, config }
    }

    pub fn obs_space(&self) -> ObsSpace {
        ObsSpace {
            image: self
                .config
                .image
                .then(|| self.config.image_shape.iter().product()),
            instr: self.config.instr.then(|| self.vocab.max_size()),
        }
    }

    /// Convert a batch of observations
    ///
    /// **Errors** if an image does not have the configured shape, or if a mission holds a new
    /// token while the vocabulary is full
    pub fn preprocess<B: Backend>(
        &mut self,
        obss: &[Obs],
        device: &B::Device,
    ) -> Result<PreprocessedObss<B>, PreprocessError> {
        let image = if self.config.image {
            let expected = self.config.image_shape;
            if let Some(img) = obss.iter().find(|obs| obs.image.shape != expected) {
                return Err(PreprocessError::ImageShape {
                    expected,
                    actual: img.image.shape,
                });
            }
            let images = obss.iter().map(|obs| obs.image.clone()).collect::<Vec<_>>();
            Some(images.to_tensor(device))
        } else {
            None
        };

        let instr = if self.config.instr {
            let instrs = obss
                .iter()
                .map(|obs| self.encode(&obs.mission))
                .collect::<Result<Vec<_>, _>>()?;
            Some(InstrBatch::pad(&instrs).to_tensor(device))
        } else {
            None
        };

        Ok(PreprocessedObss { image, instr })
    }

    /// Token ids of a mission, extending the vocabulary with unseen tokens
    pub fn encode(&mut self, mission: &str) -> Result<Vec<u32>, VocabError> {
        tokenize(mission)
            .iter()
            .map(|token| self.vocab.get_or_insert(token))
            .collect()
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn vocab_mut(&mut self) -> &mut Vocabulary {
        &mut self.vocab
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use tempdir::TempDir;

    use super::*;

    type TestBackend = NdArray;

    fn obs(mission: &str, fill: f32) -> Obs {
        Obs {
            image: Image::new(vec![fill; 147], [7, 7, 3]),
            mission: String::from(mission),
        }
    }

    fn preprocessor(tmp: &TempDir, config: PreprocessConfig) -> ObssPreprocessor {
        ObssPreprocessor::new(tmp.path(), config).unwrap()
    }

    #[test]
    fn tokenize_functional() {
        assert_eq!(
            tokenize("Pick up the RED ball, then open-door 2!"),
            vec!["pick", "up", "the", "red", "ball", "then", "open", "door"],
            "lowercased alphabetic runs"
        );
        assert!(tokenize(" 42 ").is_empty(), "no alphabetic run");
        assert_eq!(
            tokenize("go_to Café9x"),
            vec!["go", "to", "caf", "x"],
            "non-ascii letters and digits split runs"
        );
    }

    #[test]
    fn reshape_reward_functional() {
        assert_eq!(reshape_reward(0.5), 10.0);
    }

    #[test]
    fn instructions_are_padded() {
        let tmp = TempDir::new("preprocess").unwrap();
        let mut pre = preprocessor(&tmp, PreprocessConfig::default());
        let device = Default::default();
        let batch = pre
            .preprocess::<TestBackend>(
                &[obs("open door", 0.0), obs("go to the key", 1.0)],
                &device,
            )
            .unwrap();

        let instr = batch.instr.unwrap();
        assert_eq!(instr.dims(), [2, 4], "shape is (batch, longest)");
        assert_eq!(
            instr.into_data().value,
            vec![1i64, 2, 0, 0, 3, 4, 5, 6],
            "first row zero-padded in the last two positions"
        );

        let image = batch.image.unwrap();
        assert_eq!(image.dims(), [2, 7, 7, 3], "images stacked as is");
        let values = image.into_data().value;
        assert_eq!(values[0], 0.0);
        assert_eq!(values[147], 1.0, "second image follows the first");
    }

    #[test]
    fn vocabulary_is_shared_across_batches() {
        let tmp = TempDir::new("preprocess").unwrap();
        let mut pre = preprocessor(&tmp, PreprocessConfig::default());
        let device = Default::default();
        pre.preprocess::<TestBackend>(&[obs("open the door", 0.0)], &device)
            .unwrap();
        let batch = pre
            .preprocess::<TestBackend>(&[obs("the door", 0.0)], &device)
            .unwrap();
        assert_eq!(
            batch.instr.unwrap().into_data().value,
            vec![2i64, 3],
            "ids assigned by the first batch are reused"
        );
        assert_eq!(pre.vocab().len(), 3);
    }

    #[test]
    fn disabled_parts_are_skipped() {
        let tmp = TempDir::new("preprocess").unwrap();
        let config = PreprocessConfig {
            instr: false,
            ..Default::default()
        };
        let mut pre = preprocessor(&tmp, config);
        assert_eq!(
            pre.obs_space(),
            ObsSpace {
                image: Some(147),
                instr: None
            }
        );
        let batch = pre
            .preprocess::<TestBackend>(&[obs("anything", 0.0)], &Default::default())
            .unwrap();
        assert!(batch.instr.is_none(), "no instruction tensor");
        assert!(pre.vocab().is_empty(), "vocabulary untouched");
    }

    #[test]
    fn wrong_image_shape_rejected() {
        let tmp = TempDir::new("preprocess").unwrap();
        let mut pre = preprocessor(&tmp, PreprocessConfig::default());
        let bad = Obs {
            image: Image::zeros([5, 5, 3]),
            mission: String::new(),
        };
        let res = pre.preprocess::<TestBackend>(&[obs("go", 0.0), bad], &Default::default());
        assert!(matches!(
            res,
            Err(PreprocessError::ImageShape {
                expected: [7, 7, 3],
                actual: [5, 5, 3]
            })
        ));
    }

    #[test]
    fn full_vocabulary_fails() {
        let tmp = TempDir::new("preprocess").unwrap();
        let vocab = Vocabulary::open(tmp.path()).unwrap().with_max_size(2);
        let mut pre = ObssPreprocessor::with_vocab(vocab, PreprocessConfig::default());
        let res =
            pre.preprocess::<TestBackend>(&[obs("one two three", 0.0)], &Default::default());
        assert!(matches!(
            res,
            Err(PreprocessError::Vocab(VocabError::CapacityExceeded { max_size: 2 }))
        ));
    }
}
