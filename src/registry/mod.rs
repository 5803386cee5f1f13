//! Field registry: fixed-capacity table of bound configuration fields with
//! selective flash-backed persistence.
//!
//! ```text
//!  feature module ──bind──▶ FieldRegistry ──load/store──▶ PersistencePort
//!        │                       │
//!        └── Arc<ConfigField> ◀──┘  (shared live value, per-field lock)
//! ```
//!
//! The registry is populated once at startup (`bind` takes `&mut self`)
//! and then shared read-only with the dispatch worker, typically behind an
//! `Arc`.  Flash access is serialized through a single store lock; each
//! field's own lock is held only across the persistence call and the buffer
//! copy, never while an update callback runs.

mod field;
mod key;

pub use field::{ConfigField, FieldFlags, UpdateCallback};
pub use key::{ConfigKey, KeyClass};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::app::ports::PersistencePort;
use crate::config::MAX_FIELD_SIZE;
use crate::error::RegistryError;

/// Arguments for [`FieldRegistry::bind`].
pub struct FieldBinding<'a> {
    key: ConfigKey,
    initial: &'a [u8],
    saveable: bool,
    on_update: Option<UpdateCallback>,
    device: Option<&'static str>,
}

impl<'a> FieldBinding<'a> {
    /// A volatile field whose size is `initial.len()`.
    pub fn new(key: ConfigKey, initial: &'a [u8]) -> Self {
        Self {
            key,
            initial,
            saveable: false,
            on_update: None,
            device: None,
        }
    }

    /// Allow the field to be persisted to flash.
    #[must_use]
    pub fn saveable(mut self) -> Self {
        self.saveable = true;
        self
    }

    #[must_use]
    pub fn on_update(mut self, cb: impl Fn(&ConfigField) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(cb));
        self
    }

    #[must_use]
    pub fn device(mut self, name: &'static str) -> Self {
        self.device = Some(name);
        self
    }
}

/// Result of a successful [`FieldRegistry::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The stored record was copied into the live value.
    Loaded,
    /// The stored record had a stale size; the live value was written back.
    Repersisted,
}

/// Fixed-capacity registry of up to `N` fields, ordered by key.
pub struct FieldRegistry<P: PersistencePort, const N: usize> {
    fields: heapless::Vec<Arc<ConfigField>, N>,
    store: Mutex<P>,
}

impl<P: PersistencePort, const N: usize> FieldRegistry<P, N> {
    pub fn new(store: P) -> Self {
        Self {
            fields: heapless::Vec::new(),
            store: Mutex::new(store),
        }
    }

    /// Bind a field.  Saveable fields immediately try to load their stored
    /// value; a missing or unreadable record is not an error and the field
    /// keeps `initial`.
    pub fn bind(&mut self, binding: FieldBinding<'_>) -> Result<Arc<ConfigField>, RegistryError> {
        let key = binding.key;
        if !key.is_valid() {
            return Err(RegistryError::InvalidKey);
        }
        let size = binding.initial.len();
        if size == 0 || size > MAX_FIELD_SIZE {
            return Err(RegistryError::FieldTooLarge { size });
        }

        let slot = match self.position(key) {
            Ok(_) => {
                warn!("Registry: can't bind field {} twice", key);
                return Err(RegistryError::DuplicateKey(key));
            }
            Err(slot) => slot,
        };
        if self.fields.is_full() {
            warn!("Registry: field table full ({} slots), dropping {}", N, key);
            return Err(RegistryError::CapacityExceeded);
        }

        let field = Arc::new(ConfigField::new(
            key,
            binding.initial,
            binding.saveable,
            binding.on_update,
            binding.device,
        ));
        // Capacity was checked above.
        let _ = self.fields.insert(slot, Arc::clone(&field));
        debug!(
            "Registry: bound {} ({} bytes, saveable={})",
            key, size, binding.saveable
        );

        if binding.saveable {
            match self.read(key) {
                Ok(outcome) => debug!("Registry: {} initial read: {:?}", key, outcome),
                Err(e) => debug!("Registry: {} keeps default ({})", key, e),
            }
        }

        Ok(field)
    }

    /// In-memory lookup; never touches flash.
    pub fn get(&self, key: ConfigKey) -> Option<&Arc<ConfigField>> {
        self.position(key).ok().map(|i| &self.fields[i])
    }

    /// Load a saveable field's value from flash.
    ///
    /// A stored record whose length differs from the field size is treated
    /// as stale: it is not copied, and the current live value is written
    /// back in its place.
    pub fn read(&self, key: ConfigKey) -> Result<ReadOutcome, RegistryError> {
        let field = self.saveable_field(key)?;

        {
            let mut data = field.lock();
            let loaded = self.lock_store().load(key);
            match loaded {
                Ok(bytes) if bytes.len() == field.size() => {
                    data.copy_from_slice(&bytes);
                    field.set_flags(FieldFlags::READ | FieldFlags::WRITTEN);
                    return Ok(ReadOutcome::Loaded);
                }
                Ok(bytes) => {
                    info!(
                        "Registry: {} stored record is {} bytes, field is {}; rewriting",
                        key,
                        bytes.len(),
                        field.size()
                    );
                }
                Err(e) => {
                    field.clear_flags(FieldFlags::READ);
                    return Err(RegistryError::Storage(e));
                }
            }
        }

        match self.write(key) {
            Ok(()) => Ok(ReadOutcome::Repersisted),
            Err(e) => {
                field.clear_flags(FieldFlags::READ | FieldFlags::WRITTEN);
                Err(e)
            }
        }
    }

    /// Persist a saveable field's live value.
    pub fn write(&self, key: ConfigKey) -> Result<(), RegistryError> {
        let field = self.saveable_field(key)?;

        let result = {
            let data = field.lock();
            self.lock_store().store(key, &data)
        };
        match result {
            Ok(()) => {
                field.set_flags(FieldFlags::READ | FieldFlags::WRITTEN);
                Ok(())
            }
            Err(e) => {
                warn!("Registry: failed to write {} to flash: {}", key, e);
                field.clear_flags(FieldFlags::WRITTEN);
                Err(RegistryError::Storage(e))
            }
        }
    }

    /// Persist every saveable field.  Returns the number of failures.
    pub fn write_all(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.is_saveable())
            .filter(|f| self.write(f.key()).is_err())
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConfigField>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Run `f` with exclusive access to the persistence port.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.lock_store())
    }

    fn position(&self, key: ConfigKey) -> Result<usize, usize> {
        self.fields.binary_search_by_key(&key, |f| f.key())
    }

    fn saveable_field(&self, key: ConfigKey) -> Result<&Arc<ConfigField>, RegistryError> {
        let field = self.get(key).ok_or(RegistryError::NotFound(key))?;
        if !field.is_saveable() {
            return Err(RegistryError::NotSaveable(key));
        }
        Ok(field)
    }

    fn lock_store(&self) -> MutexGuard<'_, P> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
