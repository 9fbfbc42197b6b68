//! Persisted copy of the last successful feed fetch.

use std::{fs, path::Path};

use crate::{error::PageError, models::GameRecord};

/// Normalised record set written after every successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Records in feed order.
    pub records: Vec<GameRecord>,
}

impl Snapshot {
    /// Wrap an already-normalised record list.
    pub fn new(records: Vec<GameRecord>) -> Self {
        Self { records }
    }

    /// Load the snapshot; a missing file is fatal to regeneration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PageError::MissingInput {
                what: "metadata snapshot",
                path: path.to_path_buf(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|err| PageError::io(path, err))?;
        let records = serde_json::from_str(&contents).map_err(|source| PageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { records })
    }

    /// Persist as a pretty JSON array, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), PageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| PageError::io(parent, err))?;
        }

        let serialized =
            serde_json::to_string_pretty(&self.records).map_err(|source| PageError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        fs::write(path, serialized).map_err(|err| PageError::io(path, err))
    }
}
