//! Address store loading, fallback and persistence

use memory_macro::registry::{AddressConfiguration, AddressRegistry, MemoryAddresses};
use memory_macro::core::types::{Address, SENTINEL_HEX};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> AddressRegistry {
    AddressRegistry::new(dir.path().join("Config").join("addresses.json"))
}

#[test]
fn test_fallback_servers_when_store_missing() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);

    let mr = registry.server_config(0);
    assert_eq!(mr.name, "OsRO Midrate");
    assert!(!mr.addresses.hp.is_empty());

    let hr = registry.server_config(1);
    assert_eq!(hr.name, "OsRO Highrate");

    let lr = registry.server_config(2);
    assert!(lr.name.contains("Revo"));
    assert_eq!(lr.addresses.hp, SENTINEL_HEX);

    assert!(registry.has_valid_addresses(0));
    assert!(registry.has_valid_addresses(1));
    assert!(!registry.has_valid_addresses(2));
    assert!(registry.path().exists());
}

#[test]
fn test_unknown_mode_maps_to_mr() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);

    assert_eq!(AddressConfiguration::server_key(99), "MR");
    assert_eq!(registry.server_config(99), registry.server_config(0));
}

#[test]
fn test_written_store_uses_camel_case_fields() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    registry.init();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(registry.path()).unwrap()).unwrap();
    assert_eq!(json["version"], "2.1.0");
    assert!(json["lastUpdated"].is_string());
    assert_eq!(json["servers"]["MR"]["addresses"]["hp"], "00E8F434");
    assert_eq!(json["servers"]["MR"]["windowClass"], "Oldschool RO - Midrate | www.osro.mr");
    assert_eq!(json["servers"]["LR"]["verified"], false);
}

#[test]
fn test_update_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);

    let addresses = MemoryAddresses {
        hp: "01234567".into(),
        name: "089ABCDE".into(),
        ..MemoryAddresses::default()
    };
    registry.update_server_addresses(2, addresses).unwrap();
    assert!(registry.has_valid_addresses(2));

    let reopened = AddressRegistry::new(registry.path());
    let lr = reopened.server_config(2);
    assert!(lr.verified);
    assert_eq!(
        MemoryAddresses::to_pointer(&lr.addresses.hp),
        Some(Address::new(0x0123_4567))
    );
}

#[test]
fn test_reload_after_external_edit() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    registry.init();

    let mut config = registry.configuration();
    config.version = "3.0.0".into();
    fs::write(registry.path(), serde_json::to_string_pretty(&config).unwrap()).unwrap();

    assert_eq!(registry.configuration().version, "2.1.0");
    registry.reload();
    assert_eq!(registry.configuration().version, "3.0.0");
}
