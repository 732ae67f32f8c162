use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;

use crate::{error::VocabError, storage::create_folders_if_necessary};

/// Default capacity of a [`Vocabulary`]
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Path of the vocabulary file of a run
pub fn vocab_path(run_dir: impl AsRef<Path>) -> PathBuf {
    run_dir.as_ref().join("vocab.json")
}

/// A mapping from tokens to ids with a capacity of `max_size` tokens
///
/// Ids start at 1, 0 is left free for padding. The mapping is stored as a flat JSON object in the
/// `vocab.json` file of a run directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    path: PathBuf,
    max_size: usize,
    vocab: HashMap<String, u32>,
}

impl Vocabulary {
    /// Open the vocabulary of `run_dir`, loading `vocab.json` if it exists
    pub fn open(run_dir: impl AsRef<Path>) -> Result<Self, VocabError> {
        let path = vocab_path(run_dir);
        let vocab = if path.exists() {
            let vocab: HashMap<String, u32> =
                serde_json::from_reader(BufReader::new(File::open(&path)?))?;
            info!("Loaded {} tokens from {}", vocab.len(), path.display());
            vocab
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            max_size: DEFAULT_MAX_SIZE,
            vocab,
        })
    }

    /// Set the capacity
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Id of `token`, assigning the next id if the token is unseen
    ///
    /// **Errors** with [`VocabError::CapacityExceeded`] if `token` is unseen and the vocabulary
    /// already holds `max_size` tokens
    pub fn get_or_insert(&mut self, token: &str) -> Result<u32, VocabError> {
        if let Some(&id) = self.vocab.get(token) {
            return Ok(id);
        }
        if self.vocab.len() >= self.max_size {
            return Err(VocabError::CapacityExceeded {
                max_size: self.max_size,
            });
        }
        let id = self.vocab.len() as u32 + 1;
        self.vocab.insert(token.to_owned(), id);
        Ok(id)
    }

    /// Id of `token` without assigning one
    pub fn get(&self, token: &str) -> Option<u32> {
        self.vocab.get(token).copied()
    }

    /// Write the mapping to `vocab.json`
    ///
    /// The file is written next to the target and renamed over it, so a reader never sees a
    /// partial file.
    pub fn save(&self) -> Result<(), VocabError> {
        create_folders_if_necessary(&self.path)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &self.vocab)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        info!("Saved {} tokens to {}", self.vocab.len(), self.path.display());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.vocab.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
