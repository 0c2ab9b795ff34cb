use crate::agent::QTable;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("q-table io error at {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to encode q-table: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode q-table: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Where a learned table lives between runs. Callers treat every error as
/// recoverable: a failed load means starting empty, a failed save is logged.
pub trait TableStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<QTable>, PersistError>;
    fn save(&self, table: &QTable) -> Result<(), PersistError>;
}

/// bincode file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> PersistError {
        PersistError::Io { path: self.path.clone(), source }
    }
}

impl TableStore for FileStore {
    fn load(&self) -> Result<Option<QTable>, PersistError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let (table, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(Some(table))
    }

    fn save(&self, table: &QTable) -> Result<(), PersistError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let bytes = bincode::serde::encode_to_vec(table, bincode::config::standard())?;
        // readers never see a partially written table
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.bin"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/deeper/q.bin"));
        store.save(&QTable::pretrained(-100.0)).unwrap();
        assert_eq!(store.load().unwrap().map(|t| t.len()), Some(576));
    }
}
