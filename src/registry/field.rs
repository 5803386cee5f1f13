//! A single bound configuration field.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ConfigKey;
use crate::error::RegistryError;

/// Callback fired after the live value was changed by the companion app.
pub type UpdateCallback = Box<dyn Fn(&ConfigField) + Send + Sync>;

/// Field flag bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldFlags(u8);

impl FieldFlags {
    /// Field may be persisted to flash.
    pub const SAVEABLE: Self = Self(0b0000_0001);
    /// Live value was loaded from (or agrees with) flash.
    pub const READ: Self = Self(0b0000_0010);
    /// Live value has been written to flash.
    pub const WRITTEN: Self = Self(0b0000_0100);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for FieldFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for FieldFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldFlags(0b{:03b})", self.0)
    }
}

/// A configuration value shared between the module that bound it and the
/// registry.
///
/// The value buffer has a fixed size chosen at bind time.  The binding
/// module keeps an `Arc<ConfigField>` and reads or mutates the live value
/// through it; the registry takes the same lock around flash access, so a
/// persistence operation never observes a half-written value.
pub struct ConfigField {
    key: ConfigKey,
    size: usize,
    flags: AtomicU8,
    data: Mutex<Vec<u8>>,
    on_update: Option<UpdateCallback>,
    device: Option<&'static str>,
}

impl ConfigField {
    pub(crate) fn new(
        key: ConfigKey,
        initial: &[u8],
        saveable: bool,
        on_update: Option<UpdateCallback>,
        device: Option<&'static str>,
    ) -> Self {
        let flags = if saveable {
            FieldFlags::SAVEABLE
        } else {
            FieldFlags::empty()
        };
        Self {
            key,
            size: initial.len(),
            flags: AtomicU8::new(flags.bits()),
            data: Mutex::new(initial.to_vec()),
            on_update,
            device,
        }
    }

    pub fn key(&self) -> ConfigKey {
        self.key
    }

    /// Fixed value size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn flags(&self) -> FieldFlags {
        FieldFlags(self.flags.load(Ordering::Acquire))
    }

    pub fn is_saveable(&self) -> bool {
        self.flags().contains(FieldFlags::SAVEABLE)
    }

    /// Device this field configures, if the binding module supplied one.
    pub fn device(&self) -> Option<&'static str> {
        self.device
    }

    /// Copy of the live value.
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Run `f` against the live value while holding the field lock.
    pub fn with_value<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.lock())
    }

    /// Replace the live value.  Does not persist and does not fire the
    /// update callback.
    pub fn set_value(&self, value: &[u8]) -> Result<(), RegistryError> {
        if value.len() != self.size {
            return Err(RegistryError::SizeMismatch {
                expected: self.size,
                got: value.len(),
            });
        }
        self.lock().copy_from_slice(value);
        Ok(())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_flags(&self, flags: FieldFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub(crate) fn clear_flags(&self, flags: FieldFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Fire the update callback.  Must be called without the field lock.
    pub(crate) fn notify_updated(&self) {
        if let Some(cb) = &self.on_update {
            cb(self);
        }
    }
}

impl fmt::Debug for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigField")
            .field("key", &self.key)
            .field("size", &self.size)
            .field("flags", &self.flags())
            .field("device", &self.device)
            .field("on_update", &self.on_update.is_some())
            .finish_non_exhaustive()
    }
}
