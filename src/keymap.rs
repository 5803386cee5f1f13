//! Keymap rebind records.
//!
//! A rebind is persisted as a compact 11-byte record instead of the
//! behavior's device name:
//!
//! ```text
//! ┌───────────────────────────┬────────┬──────────┬──────────┐
//! │ key u16                   │ device │ param1   │ param2   │
//! │ position<<4 | layer & 0xF │ u8     │ u32 LE   │ u32 LE   │
//! └───────────────────────────┴────────┴──────────┴──────────┘
//! ```
//!
//! `device` is the id of a [`Behavior`]; the table order is part of the
//! stored format and must never change.  The KEYMAP field's value is a
//! plain concatenation of records.
//!
//! The table is compiled in rather than registered at init: ids are
//! persisted in flash, so they must not depend on registration order.

use core::fmt;

use crate::error::KeymapError;

/// Largest layer the 4-bit layer field can carry.
pub const MAX_LAYER: u8 = 0x0F;
/// Largest key position the 12-bit position field can carry.
pub const MAX_POSITION: u16 = 0x0FFF;

/// Behavior devices a key can be rebound to, by stored id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Behavior {
    Trans = 0,
    Backlight = 1,
    Bluetooth = 2,
    CapsWord = 3,
    ExtPower = 4,
    GraveEscape = 5,
    KeyPress = 6,
    KeyRepeat = 7,
    KeyToggle = 8,
    LayerTap = 9,
    MacroTap = 10,
    MacroPress = 11,
    MacroRelease = 12,
    MacroTapTime = 13,
    MacroWaitTime = 14,
    MacroWaitRelease = 15,
    ModTap = 16,
    MomentaryLayer = 17,
    MouseKeyPress = 18,
    MouseMove = 19,
    MouseScroll = 20,
    None = 21,
    Outputs = 22,
    Reset = 23,
    Bootloader = 24,
    RgbUnderglow = 25,
    EncoderKeyPress = 26,
    StickyKey = 27,
    StickyLayer = 28,
    ToLayer = 29,
    ToggleLayer = 30,
}

impl Behavior {
    /// Every behavior in id order.
    pub const ALL: [Behavior; 31] = [
        Self::Trans,
        Self::Backlight,
        Self::Bluetooth,
        Self::CapsWord,
        Self::ExtPower,
        Self::GraveEscape,
        Self::KeyPress,
        Self::KeyRepeat,
        Self::KeyToggle,
        Self::LayerTap,
        Self::MacroTap,
        Self::MacroPress,
        Self::MacroRelease,
        Self::MacroTapTime,
        Self::MacroWaitTime,
        Self::MacroWaitRelease,
        Self::ModTap,
        Self::MomentaryLayer,
        Self::MouseKeyPress,
        Self::MouseMove,
        Self::MouseScroll,
        Self::None,
        Self::Outputs,
        Self::Reset,
        Self::Bootloader,
        Self::RgbUnderglow,
        Self::EncoderKeyPress,
        Self::StickyKey,
        Self::StickyLayer,
        Self::ToLayer,
        Self::ToggleLayer,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Device name the behavior is registered under.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Trans => "TRANS",
            Self::Backlight => "BCKLGHT",
            Self::Bluetooth => "BLUETOOTH",
            Self::CapsWord => "CAPS_WORD",
            Self::ExtPower => "EXT_POWER",
            Self::GraveEscape => "GRAVE_ESCAPE",
            Self::KeyPress => "KEY_PRESS",
            Self::KeyRepeat => "KEY_REPEAT",
            Self::KeyToggle => "KEY_TOGGLE",
            Self::LayerTap => "LAYER_TAP",
            Self::MacroTap => "MAC_TAP",
            Self::MacroPress => "MAC_PRESS",
            Self::MacroRelease => "MAC_REL",
            Self::MacroTapTime => "MAC_TAP_TIME",
            Self::MacroWaitTime => "MAC_WAIT_TIME",
            Self::MacroWaitRelease => "MAC_WAIT_REL",
            Self::ModTap => "MOD_TAP",
            Self::MomentaryLayer => "MO",
            Self::MouseKeyPress => "MOUSE_KEY_PRESS",
            Self::MouseMove => "MOUSE_MOVE",
            Self::MouseScroll => "MOUSE_SCROLL",
            Self::None => "NONE",
            Self::Outputs => "OUTPUTS",
            Self::Reset => "RESET",
            Self::Bootloader => "BOOTLOAD",
            Self::RgbUnderglow => "RGB_UG",
            Self::EncoderKeyPress => "ENC_KEY_PRESS",
            Self::StickyKey => "STICKY_KEY",
            Self::StickyLayer => "STICKY_LAYER",
            Self::ToLayer => "TO_LAYER",
            Self::ToggleLayer => "TOGGLE_LAYER",
        }
    }

    /// Direct lookup by stored id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Linear lookup by device name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A live key binding as the keymap sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorBinding<'a> {
    pub device: &'a str,
    pub param1: u32,
    pub param2: u32,
}

/// One stored rebind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBinding {
    /// `position << 4 | layer`.
    pub key: u16,
    pub device: u8,
    pub param1: u32,
    pub param2: u32,
}

impl ConfigBinding {
    pub const SIZE: usize = 11;

    pub const fn layer(&self) -> u8 {
        (self.key & 0x0F) as u8
    }

    pub const fn position(&self) -> u16 {
        self.key >> 4
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.key.to_le_bytes());
        out[2] = self.device;
        out[3..7].copy_from_slice(&self.param1.to_le_bytes());
        out[7..11].copy_from_slice(&self.param2.to_le_bytes());
        out
    }

    pub fn from_bytes(b: &[u8; Self::SIZE]) -> Self {
        Self {
            key: u16::from_le_bytes([b[0], b[1]]),
            device: b[2],
            param1: u32::from_le_bytes([b[3], b[4], b[5], b[6]]),
            param2: u32::from_le_bytes([b[7], b[8], b[9], b[10]]),
        }
    }
}

/// Expand a stored record into a binding.
pub fn to_binding(record: &ConfigBinding) -> Result<BehaviorBinding<'static>, KeymapError> {
    let behavior =
        Behavior::from_id(record.device).ok_or(KeymapError::UnknownDeviceId(record.device))?;
    Ok(BehaviorBinding {
        device: behavior.name(),
        param1: record.param1,
        param2: record.param2,
    })
}

/// Compact a binding at `layer`/`position` into a stored record.
pub fn to_record(
    binding: &BehaviorBinding<'_>,
    layer: u8,
    position: u16,
) -> Result<ConfigBinding, KeymapError> {
    if layer > MAX_LAYER {
        return Err(KeymapError::InvalidLayer(layer));
    }
    if position > MAX_POSITION {
        return Err(KeymapError::InvalidPosition(position));
    }
    let behavior = Behavior::from_name(binding.device).ok_or(KeymapError::UnknownDeviceName)?;
    Ok(ConfigBinding {
        key: (position << 4) | u16::from(layer),
        device: behavior.id(),
        param1: binding.param1,
        param2: binding.param2,
    })
}

/// Concatenate records into a KEYMAP field value.
pub fn encode_records(records: &[ConfigBinding]) -> Vec<u8> {
    records.iter().flat_map(ConfigBinding::to_bytes).collect()
}

/// Split a KEYMAP field value into records.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<ConfigBinding>, KeymapError> {
    let malformed = KeymapError::Malformed { len: bytes.len() };
    if bytes.len() % ConfigBinding::SIZE != 0 {
        return Err(malformed);
    }
    bytes
        .chunks_exact(ConfigBinding::SIZE)
        .map(|c| {
            c.try_into()
                .map(ConfigBinding::from_bytes)
                .map_err(|_| malformed)
        })
        .collect()
}
