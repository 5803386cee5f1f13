//! Configuration field keys.

use core::fmt;

use serde::{Deserialize, Serialize};

/// 16-bit identifier of a configuration field.
///
/// ```text
/// 0x0000          reserved / invalid
/// 0x0001..0x3FFF  saveable  (keymap, sensitivities, timeouts)
/// 0x4000..0x7FFF  volatile  (clock, runtime state)
/// 0x8000..        custom
/// ```
///
/// The ranges are a convention for companion apps; whether a field
/// actually persists is decided by the `saveable` flag at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigKey(pub u16);

/// Range a key falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Invalid,
    Saveable,
    Volatile,
    Custom,
}

impl ConfigKey {
    pub const INVALID: Self = Self(0x0000);

    // 0x0001 - 0x0009: device information
    pub const DEVICE_INFO: Self = Self(0x0001);

    // 0x000A - 0x001F: device configuration (u16 seconds, 0 = never)
    pub const SLEEP_TIMEOUT: Self = Self(0x000A);
    pub const PERIPHERAL_SLEEP_TIMEOUT: Self = Self(0x000B);

    // 0x0020 - 0x003F: keyboard
    pub const KEYMAP: Self = Self(0x0020);

    // 0x0040 - 0x005F: mouse / trackpad (u8 each)
    pub const MOUSE_SENSITIVITY: Self = Self(0x0040);
    pub const SCROLL_SENSITIVITY: Self = Self(0x0041);
    pub const PAN_SENSITIVITY: Self = Self(0x0042);
    pub const SCROLL_DIRECTION: Self = Self(0x0043);
    pub const TP_CLICK_TYPE: Self = Self(0x0044);

    // 0x0060 - 0x007F: display
    pub const DISPLAY_CODE: Self = Self(0x0060);

    /// `[i32; 2]`: unix timestamp, timezone offset in seconds.
    pub const DATETIME: Self = Self(0x4000);

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub const fn class(self) -> KeyClass {
        match self.0 {
            0x0000 => KeyClass::Invalid,
            0x0001..=0x3FFF => KeyClass::Saveable,
            0x4000..=0x7FFF => KeyClass::Volatile,
            _ => KeyClass::Custom,
        }
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl From<u16> for ConfigKey {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
