//! Process handle wrapper with RAII semantics

use crate::core::types::{Address, MemoryError, MemoryRegion, MemoryResult, ModuleInfo, ProcessId};
use crate::memory::backend::{MemoryBackend, RawHandle};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Access rights for process handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessAccess {
    value: u32,
}

impl ProcessAccess {
    /// Query information access
    pub const QUERY_INFORMATION: Self = Self { value: 0x0400 };
    /// Read memory access
    pub const VM_READ: Self = Self { value: 0x0010 };

    /// Combine access rights
    pub fn combine(rights: &[Self]) -> Self {
        let mut value = 0;
        for right in rights {
            value |= right.value;
        }
        Self { value }
    }

    /// Rights needed to walk regions and read memory
    pub fn read_and_query() -> Self {
        Self::combine(&[Self::VM_READ, Self::QUERY_INFORMATION])
    }

    /// Get raw value
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Owned handle to a target process.
///
/// The handle is closed through its backend exactly once: on [`close`],
/// or when the value is dropped (including during unwinding).
///
/// [`close`]: ProcessHandle::close
pub struct ProcessHandle<B: MemoryBackend> {
    backend: Arc<B>,
    raw: Option<RawHandle>,
    pid: ProcessId,
    access: ProcessAccess,
}

impl<B: MemoryBackend> ProcessHandle<B> {
    /// Open a process with specified access rights
    pub fn open(backend: Arc<B>, pid: ProcessId, access: ProcessAccess) -> MemoryResult<Self> {
        let raw = backend.open_handle(pid, access)?;
        debug!(pid, handle = raw.0, "Opened process handle");
        Ok(ProcessHandle {
            backend,
            raw: Some(raw),
            pid,
            access,
        })
    }

    /// Open a process for reading memory and querying regions
    pub fn open_for_read(backend: Arc<B>, pid: ProcessId) -> MemoryResult<Self> {
        Self::open(backend, pid, ProcessAccess::read_and_query())
    }

    /// Get the process ID
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Get the access rights
    pub fn access(&self) -> ProcessAccess {
        self.access
    }

    /// Check if handle is still open
    pub fn is_valid(&self) -> bool {
        self.raw.is_some()
    }

    fn raw(&self) -> MemoryResult<RawHandle> {
        self.raw
            .ok_or_else(|| MemoryError::InvalidHandle("Process handle is closed".to_string()))
    }

    /// Read memory from the process, returning the number of bytes copied
    pub fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<usize> {
        self.backend.read_bytes(self.raw()?, address, buffer)
    }

    /// Describe the region containing `address`
    pub fn query_region(&self, address: Address) -> MemoryResult<MemoryRegion> {
        self.backend.query_region(self.raw()?, address)
    }

    /// Base and size of the process's main module
    pub fn main_module(&self) -> MemoryResult<ModuleInfo> {
        self.backend.main_module(self.raw()?)
    }

    /// Release the OS handle. Further calls are no-ops.
    pub fn close(&mut self) {
        if let Some(raw) = self.raw.take() {
            match self.backend.close_handle(raw) {
                Ok(()) => debug!(pid = self.pid, handle = raw.0, "Closed process handle"),
                Err(e) => warn!(pid = self.pid, error = %e, "Failed to close process handle"),
            }
        }
    }
}

impl<B: MemoryBackend> Drop for ProcessHandle<B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<B: MemoryBackend> fmt::Debug for ProcessHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("valid", &self.is_valid())
            .field("access", &format!("0x{:X}", self.access.value()))
            .finish()
    }
}

impl<B: MemoryBackend> fmt::Display for ProcessHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProcessHandle(pid={}, valid={})",
            self.pid,
            self.is_valid()
        )
    }
}
