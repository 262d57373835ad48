//! Rediscovering stale addresses from AOB signatures

use super::model::{AddressConfiguration, MemoryAddresses, PatternSignature};
use crate::core::types::Address;
use crate::memory::{MemoryBackend, MemoryScanner, Pattern};
use tracing::{debug, info, warn};

/// Scan the main module for `signature` and apply its offset
pub fn locate_signature<B: MemoryBackend>(
    scanner: &MemoryScanner<B>,
    signature: &PatternSignature,
) -> Option<Address> {
    let pattern = match Pattern::parse(signature.pattern.as_str()) {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!(pattern = %signature.pattern, error = %e, "Unusable signature");
            return None;
        }
    };

    let found = scanner.find_pattern(&pattern)?;
    let address = found.offset(signature.offset as isize);
    debug!(%found, %address, "Signature matched");
    Some(address)
}

/// Fresh addresses for `mode` when its stored `hp`/`name` are unset.
///
/// Returns `None` when the stored addresses are already usable, when the
/// store has no signatures, or when neither signature matches. Addresses not
/// covered by a signature are carried over.
pub fn relocate_addresses<B: MemoryBackend>(
    scanner: &MemoryScanner<B>,
    configuration: &AddressConfiguration,
    mode: i32,
) -> Option<MemoryAddresses> {
    let current = configuration
        .server(mode)
        .map(|s| s.addresses.clone())
        .unwrap_or_default();
    let stale = configuration
        .server(mode)
        .map_or(true, |s| !s.has_valid_addresses());
    if !stale {
        return None;
    }

    let signatures = configuration.pattern_signatures.as_ref()?;
    let locate = |signature: Option<&PatternSignature>| {
        signature.and_then(|s| locate_signature(scanner, s))
    };

    let hp = locate(signatures.hp.as_ref());
    let name = locate(signatures.name.as_ref());
    if hp.is_none() && name.is_none() {
        warn!(
            server = AddressConfiguration::server_key(mode),
            "No signature matched"
        );
        return None;
    }

    let mut relocated = current;
    if let Some(hp) = hp {
        relocated.hp = hp.to_config_hex();
    }
    if let Some(name) = name {
        relocated.name = name.to_config_hex();
    }
    info!(
        server = AddressConfiguration::server_key(mode),
        hp = %relocated.hp,
        name = %relocated.name,
        "Relocated addresses"
    );
    Some(relocated)
}
