//! Simulated NVS (non-volatile storage) backend.
//!
//! Implements [`PersistencePort`] over an in-memory key → record map.  The
//! on-target build supplies its own flash driver through the same trait;
//! this backend is what the host simulator and the tests run against.
//!
//! - Records are stored at their written length, so a record written by
//!   an older firmware with a different field size reads back unchanged
//!   and the registry can detect it as stale.
//! - An optional byte budget models a full partition.
//! - The whole map can be exported to / imported from a `postcard` image,
//!   which the simulator keeps on disk between runs.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::app::ports::PersistencePort;
use crate::error::StorageError;
use crate::registry::ConfigKey;

pub struct MemoryStore {
    records: BTreeMap<u16, Vec<u8>>,
    budget: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("MemoryStore: simulation backend");
        Self {
            records: BTreeMap::new(),
            budget: None,
        }
    }

    /// A store that refuses writes once `bytes` of record data are used.
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            budget: Some(bytes),
        }
    }

    /// Restore a store from a `postcard` image produced by [`to_image`](Self::to_image).
    pub fn from_image(image: &[u8]) -> Result<Self, StorageError> {
        let records: BTreeMap<u16, Vec<u8>> =
            postcard::from_bytes(image).map_err(|_| StorageError::IoError)?;
        info!("MemoryStore: restored {} records", records.len());
        Ok(Self {
            records,
            budget: None,
        })
    }

    pub fn to_image(&self) -> Result<Vec<u8>, StorageError> {
        postcard::to_allocvec(&self.records).map_err(|_| StorageError::IoError)
    }

    /// Place a record directly, bypassing the budget.
    pub fn insert_raw(&mut self, key: ConfigKey, data: &[u8]) {
        self.records.insert(key.raw(), data.to_vec());
    }

    pub fn get_raw(&self, key: ConfigKey) -> Option<Vec<u8>> {
        self.records.get(&key.raw()).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn used_bytes_excluding(&self, key: u16) -> usize {
        self.records
            .iter()
            .filter(|(k, _)| **k != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl PersistencePort for MemoryStore {
    fn load(&self, key: ConfigKey) -> Result<Vec<u8>, StorageError> {
        self.records
            .get(&key.raw())
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn store(&mut self, key: ConfigKey, data: &[u8]) -> Result<(), StorageError> {
        if let Some(budget) = self.budget {
            if self.used_bytes_excluding(key.raw()) + data.len() > budget {
                return Err(StorageError::Full);
            }
        }
        self.records.insert(key.raw(), data.to_vec());
        debug!("MemoryStore: stored {} ({} bytes)", key, data.len());
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
