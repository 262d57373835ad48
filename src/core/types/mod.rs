//! Core type definitions
//!
//! Address wrappers, memory region descriptions and error types shared by the
//! scanner, the monitor and the address registry.

mod address;
mod error;
mod region;

pub use address::{is_sentinel, Address, SENTINEL_HEX};
pub use error::{MemoryError, MemoryResult};
pub use region::{MemoryRegion, ModuleInfo, Protection, MEM_COMMIT, MEM_FREE, MEM_RESERVE};

pub type ProcessId = u32;
