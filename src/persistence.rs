// src/persistence.rs - Storage for the tuned heating-curve coefficients
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read coefficients from '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write coefficients to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt coefficient record: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode coefficients: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The two heating-curve coefficients as written to a store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    /// W per °C of outdoor deficit
    pub k1: f64,
    /// W offset
    pub k2: f64,
}

/// A record read back from a store. Either key may be missing; unknown keys
/// are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct StoredCoefficients {
    #[serde(default)]
    pub k1: Option<f64>,
    #[serde(default)]
    pub k2: Option<f64>,
}

impl StoredCoefficients {
    /// Fill missing keys from `defaults`.
    pub fn or(self, defaults: Coefficients) -> Coefficients {
        Coefficients {
            k1: self.k1.unwrap_or(defaults.k1),
            k2: self.k2.unwrap_or(defaults.k2),
        }
    }
}

impl From<Coefficients> for StoredCoefficients {
    fn from(c: Coefficients) -> Self {
        Self { k1: Some(c.k1), k2: Some(c.k2) }
    }
}

/// Backing store for the coefficients. `load` returns `Ok(None)` when nothing
/// has been stored yet; `save` overwrites any previous value.
pub trait CoefficientStore: Send {
    fn load(&self) -> Result<Option<StoredCoefficients>, PersistenceError>;
    fn save(&self, coefficients: &Coefficients) -> Result<(), PersistenceError>;
}

/// JSON file holding `{"k1": .., "k2": ..}`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CoefficientStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoredCoefficients>, PersistenceError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let stored = serde_json::from_str(&contents).map_err(PersistenceError::Decode)?;
        Ok(Some(stored))
    }

    fn save(&self, coefficients: &Coefficients) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(coefficients).map_err(PersistenceError::Encode)?;
        std::fs::write(&self.path, json).map_err(|e| PersistenceError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        tracing::trace!("Saved coefficients to {}", self.path.display());
        Ok(())
    }
}

/// In-process store. Clones share the same slot, so a second controller
/// built from a clone sees what the first one saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Coefficients>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(coefficients: Coefficients) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(coefficients))),
        }
    }

    /// Last saved value, if any.
    pub fn get(&self) -> Option<Coefficients> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CoefficientStore for MemoryStore {
    fn load(&self) -> Result<Option<StoredCoefficients>, PersistenceError> {
        Ok(self.get().map(StoredCoefficients::from))
    }

    fn save(&self, coefficients: &Coefficients) -> Result<(), PersistenceError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(*coefficients);
        Ok(())
    }
}
