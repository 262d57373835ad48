//! Core module containing fundamental types shared across the crate

pub mod types;

pub use types::{Address, MemoryError, MemoryRegion, MemoryResult, ModuleInfo, ProcessId};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
