//! Serialized shape of the address store (`addresses.json`)

use crate::core::types::{is_sentinel, Address, SENTINEL_HEX};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Key used for an unknown server mode
pub const DEFAULT_SERVER_KEY: &str = "MR";

/// Default size of the status buffer, in bytes
pub const DEFAULT_STATUS_BUFFER_SIZE: i32 = 108;

fn sentinel() -> String {
    SENTINEL_HEX.to_string()
}

fn default_status_buffer_size() -> i32 {
    DEFAULT_STATUS_BUFFER_SIZE
}

/// Stores written by other tools emit `null` for unset objects
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_sentinel<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(sentinel))
}

/// Root document of the address store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressConfiguration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub last_updated: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: BTreeMap<String, ServerAddressConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_signatures: Option<PatternSignatures>,
}

impl AddressConfiguration {
    /// Map a server mode to its store key: 0 MR, 1 HR, 2 LR, anything else MR
    pub fn server_key(mode: i32) -> &'static str {
        match mode {
            1 => "HR",
            2 => "LR",
            _ => DEFAULT_SERVER_KEY,
        }
    }

    /// The stored entry for `mode`, if present
    pub fn server(&self, mode: i32) -> Option<&ServerAddressConfig> {
        self.servers.get(Self::server_key(mode))
    }

    pub fn server_mut(&mut self, mode: i32) -> Option<&mut ServerAddressConfig> {
        self.servers.get_mut(Self::server_key(mode))
    }
}

/// One game server's addresses and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerAddressConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_class: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: MemoryAddresses,

    #[serde(default, deserialize_with = "null_as_default")]
    pub offsets: MemoryOffsets,

    #[serde(default)]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ServerAddressConfig {
    /// Both `hp` and `name` are set to something other than the sentinel
    pub fn has_valid_addresses(&self) -> bool {
        !is_sentinel(&self.addresses.hp) && !is_sentinel(&self.addresses.name)
    }
}

/// Hex-encoded static addresses of game values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryAddresses {
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub hp: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub sp: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub max_hp: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub max_sp: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub name: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub map: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub online: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub base_level: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub job_level: String,
    #[serde(default = "sentinel", deserialize_with = "null_as_sentinel")]
    pub status_buffer: String,
}

impl Default for MemoryAddresses {
    fn default() -> Self {
        MemoryAddresses {
            hp: sentinel(),
            sp: sentinel(),
            max_hp: sentinel(),
            max_sp: sentinel(),
            name: sentinel(),
            map: sentinel(),
            online: sentinel(),
            base_level: sentinel(),
            job_level: sentinel(),
            status_buffer: sentinel(),
        }
    }
}

impl MemoryAddresses {
    /// Parse a stored hex address; sentinel, empty or malformed values give `None`
    pub fn to_pointer(hex: &str) -> Option<Address> {
        Address::from_config_hex(hex)
    }

    /// Every address paired with its store field name
    pub fn named(&self) -> [(&'static str, &str); 10] {
        [
            ("hp", self.hp.as_str()),
            ("sp", self.sp.as_str()),
            ("maxHp", self.max_hp.as_str()),
            ("maxSp", self.max_sp.as_str()),
            ("name", self.name.as_str()),
            ("map", self.map.as_str()),
            ("online", self.online.as_str()),
            ("baseLevel", self.base_level.as_str()),
            ("jobLevel", self.job_level.as_str()),
            ("statusBuffer", self.status_buffer.as_str()),
        ]
    }

    /// Addresses that resolve to a pointer, keyed by field name
    pub fn resolved(&self) -> Vec<(&'static str, Address)> {
        self.named()
            .iter()
            .filter_map(|(field, hex)| Self::to_pointer(hex).map(|addr| (*field, addr)))
            .collect()
    }
}

/// Offsets into composite game structures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryOffsets {
    #[serde(default)]
    pub status_buffer_offset: i32,
    #[serde(default = "default_status_buffer_size")]
    pub status_buffer_size: i32,
}

impl Default for MemoryOffsets {
    fn default() -> Self {
        MemoryOffsets {
            status_buffer_offset: 0,
            status_buffer_size: DEFAULT_STATUS_BUFFER_SIZE,
        }
    }
}

/// AOB signatures used to rediscover addresses after a client update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatternSignatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<PatternSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PatternSignature>,
}

/// An AOB pattern plus the distance from its match to the wanted address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatternSignature {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern: String,
    #[serde(default)]
    pub offset: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
