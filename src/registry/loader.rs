//! Loading, falling back and persisting the address store

use super::fallback::{fallback_configuration, fallback_server, today};
use super::model::{AddressConfiguration, MemoryAddresses, ServerAddressConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{error, info, warn};

/// Address store error type
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server {0} not found in address store")]
    UnknownServer(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Address store backed by a JSON file.
///
/// Lookups initialize lazily. Once initialized the registry always holds a
/// usable document: a missing or unreadable file is replaced by the built-in
/// fallback, which is also written back to disk.
pub struct AddressRegistry {
    path: PathBuf,
    loaded: RwLock<Option<AddressConfiguration>>,
}

impl AddressRegistry {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        AddressRegistry {
            path: path.as_ref().to_path_buf(),
            loaded: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_some()
    }

    /// Load the store if that has not happened yet
    pub fn init(&self) {
        let mut loaded = self.write();
        if loaded.is_none() {
            *loaded = Some(self.load_or_create());
        }
    }

    /// Discard the loaded document and load it again
    pub fn reload(&self) {
        let mut loaded = self.write();
        *loaded = Some(self.load_or_create());
    }

    /// A copy of the loaded document
    pub fn configuration(&self) -> AddressConfiguration {
        self.init();
        self.read().clone().unwrap_or_else(fallback_configuration)
    }

    /// Entry for `mode`; a missing entry yields the built-in one
    pub fn server_config(&self, mode: i32) -> ServerAddressConfig {
        self.init();
        match self.read().as_ref().and_then(|c| c.server(mode)) {
            Some(server) => server.clone(),
            None => {
                warn!(mode, "No address entry for server, using fallback");
                fallback_server(mode)
            }
        }
    }

    pub fn has_valid_addresses(&self, mode: i32) -> bool {
        self.server_config(mode).has_valid_addresses()
    }

    /// Replace a server's addresses, mark them verified today and persist
    pub fn update_server_addresses(
        &self,
        mode: i32,
        addresses: MemoryAddresses,
    ) -> RegistryResult<()> {
        self.init();
        let key = AddressConfiguration::server_key(mode);

        let mut loaded = self.write();
        let config = loaded.get_or_insert_with(fallback_configuration);
        let server = config.server_mut(mode).ok_or_else(|| {
            warn!(server = key, "Server not found in address store");
            RegistryError::UnknownServer(key.to_string())
        })?;

        server.addresses = addresses;
        server.verified = true;
        server.verified_date = Some(today());

        self.persist(config).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Failed to save address store");
            e
        })?;
        info!(server = key, "Updated server addresses");
        Ok(())
    }

    fn load_or_create(&self) -> AddressConfiguration {
        if let Err(e) = self.ensure_directory() {
            warn!(path = %self.path.display(), error = %e, "Could not create address store directory");
        }

        match self.load_file() {
            Ok(config) => {
                info!(version = %config.version, "Address store loaded");
                config
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Address store unusable, writing fallback"
                );
                let fallback = fallback_configuration();
                if let Err(e) = self.persist(&fallback) {
                    error!(path = %self.path.display(), error = %e, "Failed to write fallback address store");
                }
                fallback
            }
        }
    }

    fn load_file(&self) -> RegistryResult<AddressConfiguration> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn persist(&self, config: &AddressConfiguration) -> RegistryResult<()> {
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    fn ensure_directory(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                fs::create_dir_all(dir)?;
                info!(dir = %dir.display(), "Created address store directory");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<AddressConfiguration>> {
        self.loaded.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<AddressConfiguration>> {
        self.loaded.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AddressRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressRegistry")
            .field("path", &self.path)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
