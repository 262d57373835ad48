//! Periodic polling of a server's configured addresses

use crate::core::types::Address;
use crate::memory::{MemoryBackend, MemoryScanner};
use crate::registry::ServerAddressConfig;
use crate::runner::{TaskRunner, TaskState};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, trace};

/// Latest value read for each watched address, as eight hex digits
pub type Snapshot = BTreeMap<&'static str, String>;

/// Reads every configured address of one server on a fixed interval.
///
/// Addresses left at the sentinel are not watched. Ticks taken while the
/// scanner is detached count as runner failures and leave the snapshot alone.
pub struct AddressMonitor {
    runner: TaskRunner,
    watched: Vec<(&'static str, Address)>,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl AddressMonitor {
    pub fn new<B>(
        scanner: Arc<MemoryScanner<B>>,
        server: &ServerAddressConfig,
        interval: Duration,
    ) -> Self
    where
        B: MemoryBackend + 'static,
    {
        let watched = server.addresses.resolved();
        let snapshot = Arc::new(RwLock::new(Snapshot::new()));

        let targets = watched.clone();
        let shared = Arc::clone(&snapshot);
        let runner = TaskRunner::fixed(format!("monitor-{}", server.name), interval, move || {
            if !scanner.is_attached() {
                anyhow::bail!("scanner is not attached to a process");
            }

            let values: Snapshot = targets
                .iter()
                .map(|(field, address)| (*field, scanner.read_as_hex(*address)))
                .collect();
            trace!(?values, "Monitor tick");

            *shared.write().unwrap_or_else(PoisonError::into_inner) = values;
            Ok(true)
        });

        debug!(server = %server.name, watched = watched.len(), "Address monitor created");
        AddressMonitor {
            runner,
            watched,
            snapshot,
        }
    }

    /// Field names and addresses being polled
    pub fn watched(&self) -> &[(&'static str, Address)] {
        &self.watched
    }

    /// Values from the most recent completed tick
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    pub fn state(&self) -> TaskState {
        self.runner.state()
    }

    pub fn start(&self) {
        self.runner.start();
    }

    pub fn suspend(&self) {
        self.runner.suspend();
    }

    pub fn terminate(&self) {
        self.runner.terminate();
    }
}
