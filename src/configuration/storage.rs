use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::StorageError;

/// Whole-record key/value persistence.
pub trait RecordStorage {
    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: HashMap<String, Vec<u8>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, key: &str, bytes: &[u8]) -> Self {
        self.records.insert(key.to_string(), bytes.to_vec());
        self
    }

    pub fn get_raw(&self, key: &str) -> Option<&[u8]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Makes every following `save` fail, as a full or read-only flash would.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl RecordStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.records
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::backend(key, "write rejected"));
        }

        self.records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// One `<key>.json` file per record under `base_dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl RecordStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.record_path(key);

        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound {
                key: key.to_string(),
            },
            _ => StorageError::backend(key, e),
        })
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| StorageError::backend(key, e))?;

        // Write beside the record then rename, so a reader never sees half a record.
        let path = self.record_path(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, bytes).map_err(|e| StorageError::backend(key, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::backend(key, e))?;

        debug!("Stored {} bytes in {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_reports_missing_key() {
        let storage = MemoryStorage::new();

        assert_eq!(
            storage.load("ph_calibration"),
            Err(StorageError::NotFound {
                key: "ph_calibration".to_string()
            })
        );
    }

    #[test]
    fn memory_storage_rejects_writes_when_failing() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_writes(true);

        assert!(matches!(
            storage.save("ph_calibration", b"{}"),
            Err(StorageError::Backend { .. })
        ));
        assert!(storage.get_raw("ph_calibration").is_none());
    }

    #[test]
    fn file_storage_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));

        storage.save("ph_calibration", b"{\"slope\":1.0}").unwrap();

        assert_eq!(storage.load("ph_calibration").unwrap(), b"{\"slope\":1.0}");
        assert!(storage.record_path("ph_calibration").exists());
        assert!(!dir.path().join("nested/ph_calibration.json.tmp").exists());
    }

    #[test]
    fn file_storage_distinguishes_missing_from_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(matches!(
            storage.load("ph_calibration"),
            Err(StorageError::NotFound { .. })
        ));

        // A directory where the record should be cannot be read as a file.
        fs::create_dir(storage.record_path("ph_calibration")).unwrap();
        assert!(matches!(
            storage.load("ph_calibration"),
            Err(StorageError::Backend { .. })
        ));
    }
}
