//! Memory scanning for an attached process
//!
//! This module provides:
//! - The backend trait the scanner reads target memory through
//! - AOB pattern parsing and masked matching
//! - The region-walking scanner
//! - An in-memory backend for tests and benchmarks

pub mod backend;
pub mod in_memory;
pub mod pattern;
pub mod scanner;

pub use backend::{MemoryBackend, RawHandle};
pub use in_memory::{InMemoryBackend, SimulatedProcess, SimulatedRegion};
pub use pattern::{matches, Pattern, MASK_EXACT, MASK_WILDCARD};
pub use scanner::{MemoryScanner, ScanOptions, CHUNK_SIZE, DEFAULT_MAX_RESULTS};
