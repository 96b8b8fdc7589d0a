use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use super::storage::RecordStorage;
use crate::error::StorageError;

static IS_NVS_TAKEN: AtomicBool = AtomicBool::new(false);

const NAMESPACE: &str = "ph_sensor";

/// Records stored as NVS blobs. Keys are limited to 15 characters by NVS.
pub struct NvsStorage {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStorage {
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, StorageError> {
        if IS_NVS_TAKEN.swap(true, Ordering::Relaxed) {
            return Err(StorageError::backend(NAMESPACE, "NVS namespace already taken"));
        }

        match EspNvs::new(partition, NAMESPACE, true) {
            Ok(nvs) => Ok(Self { nvs }),
            Err(e) => {
                IS_NVS_TAKEN.store(false, Ordering::Relaxed);
                Err(StorageError::backend(
                    NAMESPACE,
                    format!("failed to open namespace: {e}"),
                ))
            }
        }
    }
}

impl RecordStorage for NvsStorage {
    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let not_found = || StorageError::NotFound {
            key: key.to_string(),
        };

        let size = self
            .nvs
            .blob_len(key)
            .map_err(|e| StorageError::backend(key, e))?
            .ok_or_else(not_found)?;

        let mut buf = vec![0; size];
        let data = self
            .nvs
            .get_blob(key, &mut buf)
            .map_err(|e| StorageError::backend(key, e))?
            .ok_or_else(not_found)?;

        Ok(data.to_vec())
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.nvs
            .set_blob(key, bytes)
            .map_err(|e| StorageError::backend(key, e))
    }
}

impl Drop for NvsStorage {
    fn drop(&mut self) {
        IS_NVS_TAKEN.store(false, Ordering::Relaxed);
    }
}
