//! Memory address wrapper type with hex parsing and the address-store format

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address-store representation of an unconfigured address
pub const SENTINEL_HEX: &str = "00000000";

/// Represents a memory address in the target process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub usize);

impl Address {
    /// Creates a new address from a usize value
    pub const fn new(value: usize) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Adds an unsigned displacement, saturating at the top of the address space
    pub const fn add(&self, displacement: usize) -> Self {
        Address(self.0.saturating_add(displacement))
    }

    /// Adds a signed offset to the address
    pub const fn offset(&self, offset: isize) -> Self {
        Address(self.0.wrapping_add_signed(offset))
    }

    /// Returns the raw usize value
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Parses the 8-hex-digit address-store format.
    ///
    /// Empty strings, the sentinel and anything that is not hex map to `None`.
    pub fn from_config_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if is_sentinel(hex) {
            return None;
        }
        match usize::from_str_radix(hex, 16) {
            Ok(0) | Err(_) => None,
            Ok(value) => Some(Address(value)),
        }
    }

    /// Formats the address the way the address store expects it
    pub fn to_config_hex(&self) -> String {
        format!("{:08X}", self.0)
    }
}

/// True for the empty string and the `"00000000"` sentinel
pub fn is_sentinel(hex: &str) -> bool {
    hex.is_empty() || hex == SENTINEL_HEX
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> MemoryResult<Self> {
        let s = s.trim();

        let value = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            usize::from_str_radix(rest, 16)
        } else if let Some(rest) = s.strip_prefix('$') {
            usize::from_str_radix(rest, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            usize::from_str_radix(s, 16)
        } else {
            s.parse::<usize>().or_else(|_| usize::from_str_radix(s, 16))
        };

        value
            .map(Address::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value)
    }
}
