//! memory-macro: AOB pattern scanning and address monitoring for game clients
//!
//! The scanner walks the committed, readable regions of an attached process
//! and reports addresses matching a masked byte pattern. All OS access goes
//! through [`memory::MemoryBackend`], implemented over the Windows API on
//! Windows and by [`memory::InMemoryBackend`] everywhere.

pub mod config;
pub mod core;
pub mod memory;
pub mod monitor;
pub mod process;
pub mod registry;
pub mod runner;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo, ProcessId};

pub use memory::{MemoryBackend, MemoryScanner, Pattern, ScanOptions};
pub use monitor::AddressMonitor;
pub use registry::{AddressRegistry, MemoryAddresses, ServerAddressConfig};
pub use runner::{StepOutcome, TaskRunner, TaskState};

pub use crate::core::{AUTHORS, VERSION};
