//! Field registry against a flash store with injected failures.

use boardpilot::error::{RegistryError, StorageError};
use boardpilot::registry::{ConfigKey, FieldBinding, FieldFlags, KeyClass, ReadOutcome};

use crate::mock_hw::{MockFlash, TestRegistry};

#[test]
fn unreadable_flash_keeps_default_value() {
    let mut flash = MockFlash::new().with_record(ConfigKey::SLEEP_TIMEOUT, &[0x10, 0x0E]);
    flash.fail_loads = true;
    let mut reg = TestRegistry::new(flash);
    let field = reg
        .bind(FieldBinding::new(ConfigKey::SLEEP_TIMEOUT, &[0x58, 0x02]).saveable())
        .unwrap();
    assert_eq!(field.snapshot(), vec![0x58, 0x02]);
    assert!(!field.flags().contains(FieldFlags::READ));
    assert_eq!(
        reg.read(ConfigKey::SLEEP_TIMEOUT),
        Err(RegistryError::Storage(StorageError::IoError))
    );
}

#[test]
fn stale_record_is_repersisted_once() {
    let flash = MockFlash::new().with_record(ConfigKey::MOUSE_SENSITIVITY, &[1, 2, 3]);
    let mut reg = TestRegistry::new(flash);
    let field = reg
        .bind(FieldBinding::new(ConfigKey::MOUSE_SENSITIVITY, &[10]).saveable())
        .unwrap();

    assert_eq!(field.snapshot(), vec![10]);
    assert!(field.flags().contains(FieldFlags::READ | FieldFlags::WRITTEN));
    assert_eq!(reg.with_store(|s| s.stores), 1);
    assert_eq!(reg.read(ConfigKey::MOUSE_SENSITIVITY), Ok(ReadOutcome::Loaded));
    assert_eq!(reg.with_store(|s| s.stores), 1);
}

#[test]
fn failed_repersist_clears_read_and_written_only() {
    let mut flash = MockFlash::new().with_record(ConfigKey::KEYMAP, &[0; 3]);
    flash.fail_stores = true;
    let mut reg = TestRegistry::new(flash);
    let field = reg
        .bind(FieldBinding::new(ConfigKey::KEYMAP, &[0; 11]).saveable())
        .unwrap();

    let flags = field.flags();
    assert!(flags.contains(FieldFlags::SAVEABLE));
    assert!(!flags.contains(FieldFlags::READ));
    assert!(!flags.contains(FieldFlags::WRITTEN));
    assert_eq!(
        reg.read(ConfigKey::KEYMAP),
        Err(RegistryError::Storage(StorageError::Full))
    );
    assert!(field.is_saveable());
}

#[test]
fn write_all_counts_failures() {
    let mut reg = TestRegistry::new(MockFlash::new());
    reg.bind(FieldBinding::new(ConfigKey::SLEEP_TIMEOUT, &[0, 0]).saveable())
        .unwrap();
    reg.bind(FieldBinding::new(ConfigKey::MOUSE_SENSITIVITY, &[5]).saveable())
        .unwrap();
    reg.bind(FieldBinding::new(ConfigKey::DATETIME, &[0; 8])).unwrap();

    assert_eq!(reg.write_all(), 0);
    reg.with_store(|s| s.fail_stores = true);
    assert_eq!(reg.write_all(), 2);
    for f in reg.iter().filter(|f| f.is_saveable()) {
        assert!(!f.flags().contains(FieldFlags::WRITTEN));
    }
}

#[test]
fn set_value_is_live_only_until_written() {
    let mut reg = TestRegistry::new(MockFlash::new());
    let field = reg
        .bind(FieldBinding::new(ConfigKey::SCROLL_DIRECTION, &[0]).saveable())
        .unwrap();
    field.set_value(&[1]).unwrap();
    assert_eq!(reg.with_store(|s| s.inner.get_raw(ConfigKey::SCROLL_DIRECTION)), None);

    reg.write(ConfigKey::SCROLL_DIRECTION).unwrap();
    assert_eq!(
        reg.with_store(|s| s.inner.get_raw(ConfigKey::SCROLL_DIRECTION)),
        Some(vec![1])
    );
    assert_eq!(
        field.set_value(&[1, 2]),
        Err(RegistryError::SizeMismatch {
            expected: 1,
            got: 2
        })
    );
}

#[test]
fn key_classes_follow_ranges() {
    assert_eq!(ConfigKey::INVALID.class(), KeyClass::Invalid);
    assert_eq!(ConfigKey::KEYMAP.class(), KeyClass::Saveable);
    assert_eq!(ConfigKey::DATETIME.class(), KeyClass::Volatile);
    assert_eq!(ConfigKey(0x8001).class(), KeyClass::Custom);
}

#[test]
fn device_handle_is_kept() {
    let mut reg = TestRegistry::new(MockFlash::new());
    let field = reg
        .bind(FieldBinding::new(ConfigKey::PERIPHERAL_SLEEP_TIMEOUT, &[0; 2]).device("split"))
        .unwrap();
    assert_eq!(field.device(), Some("split"));
    assert_eq!(reg.get(ConfigKey::PERIPHERAL_SLEEP_TIMEOUT).unwrap().device(), Some("split"));
}
