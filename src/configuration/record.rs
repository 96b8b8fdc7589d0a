use log::debug;
use serde_json::{Map, Value};

use crate::error::StorageError;

/// A stored JSON object read field by field, each field falling back to its
/// own default when missing or of the wrong type.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn parse(key: &str, bytes: &[u8]) -> Result<Self, StorageError> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(other) => Err(StorageError::corrupt(
                key,
                format!("expected an object, found {other}"),
            )),
            Err(e) => Err(StorageError::corrupt(key, e)),
        }
    }

    pub fn read_float(&self, key: &str, default: f64) -> f64 {
        match self.fields.get(key).and_then(Value::as_f64) {
            Some(value) if value.is_finite() => value,
            _ => self.fallback(key, default),
        }
    }

    pub fn read_unsigned(&self, key: &str, default: u64) -> u64 {
        match self.fields.get(key).and_then(Value::as_u64) {
            Some(value) => value,
            None => self.fallback(key, default),
        }
    }

    pub fn read_string(&self, key: &str, default: &str) -> String {
        match self.fields.get(key).and_then(Value::as_str) {
            Some(value) => value.to_string(),
            None => self.fallback(key, default.to_string()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    fn fallback<T: std::fmt::Debug>(&self, key: &str, default: T) -> T {
        if self.fields.contains_key(key) {
            debug!("Field '{key}' unreadable, using default {default:?}");
        }
        default
    }
}
