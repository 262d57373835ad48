//! Built-in address store used when no usable file exists

use super::model::{AddressConfiguration, MemoryAddresses, ServerAddressConfig};
use chrono::Local;
use std::collections::BTreeMap;

pub const FALLBACK_VERSION: &str = "2.1.0";

/// Today's date as stored in `lastUpdated` and `verifiedDate`
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn addresses(hp: &str, name: &str, map: &str, online: &str) -> MemoryAddresses {
    MemoryAddresses {
        hp: hp.to_string(),
        name: name.to_string(),
        map: map.to_string(),
        online: online.to_string(),
        ..MemoryAddresses::default()
    }
}

/// The three known servers; MR and HR carry verified addresses, LR is unset
pub fn fallback_configuration() -> AddressConfiguration {
    let mut servers = BTreeMap::new();

    servers.insert(
        "MR".to_string(),
        ServerAddressConfig {
            name: "OsRO Midrate".to_string(),
            description: Some("OsRO Midrate Server".to_string()),
            website: Some("https://osro.mr".to_string()),
            window_class: Some("Oldschool RO - Midrate | www.osro.mr".to_string()),
            addresses: addresses("00E8F434", "00E91C00", "00E8ABD4", "00E8A928"),
            verified: true,
            verified_date: Some("2025-12-09".to_string()),
            ..ServerAddressConfig::default()
        },
    );

    servers.insert(
        "HR".to_string(),
        ServerAddressConfig {
            name: "OsRO Highrate".to_string(),
            description: Some("OsRO Highrate Server".to_string()),
            website: Some("https://osro.gg".to_string()),
            window_class: Some("Oldschool RO | www.osro.gg".to_string()),
            addresses: addresses("010DCE10", "010DF5D8", "010D856C", "010D83C7"),
            verified: true,
            verified_date: Some("2025-12-09".to_string()),
            ..ServerAddressConfig::default()
        },
    );

    servers.insert(
        "LR".to_string(),
        ServerAddressConfig {
            name: "OsRO Revo".to_string(),
            description: Some("OsRO Revo (Lowrate) - Addresses not configured".to_string()),
            website: Some("https://osro-revo.gg".to_string()),
            window_class: Some("Oldschool RO | Revo".to_string()),
            verified: false,
            notes: Some(
                "Memory addresses need to be discovered. See docs/CONTRIBUTING.md".to_string(),
            ),
            ..ServerAddressConfig::default()
        },
    );

    AddressConfiguration {
        version: FALLBACK_VERSION.to_string(),
        last_updated: today(),
        description: "Hardcoded fallback configuration".to_string(),
        servers,
        pattern_signatures: None,
    }
}

/// Fallback entry for `mode`, using MR for unknown modes
pub fn fallback_server(mode: i32) -> ServerAddressConfig {
    let mut fallback = fallback_configuration();
    let key = AddressConfiguration::server_key(mode);
    fallback
        .servers
        .remove(key)
        .unwrap_or_default()
}
