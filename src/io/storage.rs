use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Named text blobs: saved pieces and the last editor state.
pub trait TextStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, text: &str) -> Result<(), StoreError>;
    fn names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// Restored on startup; overwritten on every save of the working text.
    pub last_saved_state: Option<String>,
    pub user_files: BTreeMap<String, String>,
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Encoding(postcard::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store i/o error: {}", e),
            StoreError::Encoding(e) => write!(f, "store encoding error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<postcard::Error> for StoreError {
    fn from(e: postcard::Error) -> Self {
        StoreError::Encoding(e)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: StoreState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }
}

impl TextStore for MemoryStore {
    fn get(&self, name: &str) -> Option<String> {
        self.state.user_files.get(name).cloned()
    }

    fn set(&mut self, name: &str, text: &str) -> Result<(), StoreError> {
        self.state
            .user_files
            .insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        self.state.user_files.keys().cloned().collect()
    }
}

/// A store persisted as one postcard-encoded file, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: StoreState,
}

impl FileStore {
    /// Load the store at `path`, creating an empty one if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let bytes = fs::read(&path)?;
            let state = postcard::from_bytes(&bytes)?;
            tracing::debug!(path = %path.display(), "store loaded");
            Ok(FileStore { path, state })
        } else {
            let store = FileStore {
                path,
                state: StoreState::default(),
            };
            store.save()?;
            tracing::debug!(path = %store.path.display(), "store created");
            Ok(store)
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(&self.state)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_saved_state(&self) -> Option<&str> {
        self.state.last_saved_state.as_deref()
    }

    pub fn set_last_saved_state(&mut self, text: &str) -> Result<(), StoreError> {
        self.state.last_saved_state = Some(text.to_string());
        self.save()
    }
}

impl TextStore for FileStore {
    fn get(&self, name: &str) -> Option<String> {
        self.state.user_files.get(name).cloned()
    }

    fn set(&mut self, name: &str, text: &str) -> Result<(), StoreError> {
        self.state
            .user_files
            .insert(name.to_string(), text.to_string());
        self.save()
    }

    fn names(&self) -> Vec<String> {
        self.state.user_files.keys().cloned().collect()
    }
}
