//! Address registry
//!
//! Seed addresses for each supported game server, loaded from a JSON store
//! with a built-in fallback, plus signature-based relocation for servers
//! whose addresses have gone stale.

pub mod fallback;
pub mod loader;
pub mod model;
pub mod relocate;

pub use fallback::{fallback_configuration, fallback_server};
pub use loader::{AddressRegistry, RegistryError, RegistryResult};
pub use model::{
    AddressConfiguration, MemoryAddresses, MemoryOffsets, PatternSignature, PatternSignatures,
    ServerAddressConfig,
};
pub use relocate::{locate_signature, relocate_addresses};
