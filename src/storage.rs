use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

/// Environment variable overriding the storage root
pub const STORAGE_ENV: &str = "MENV_STORAGE";

/// Layout of the directories holding training runs and computed statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root taken from `MENV_STORAGE`, `storage` if unset
    pub fn from_env() -> Self {
        Self::new(env::var_os(STORAGE_ENV).unwrap_or_else(|| "storage".into()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a training run, or of a group of runs
    pub fn model_dir(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join("models").join(name)
    }

    /// Directory receiving plots
    pub fn stats_dir(&self) -> PathBuf {
        self.root.join("stats")
    }
}

/// Create the parent folders of `path` if they do not exist
pub fn create_folders_if_necessary(path: impl AsRef<Path>) -> io::Result<()> {
    match path.as_ref().parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
