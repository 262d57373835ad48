//! Platform capability interface used by the scanner
//!
//! The region walk and matcher never touch the OS directly. Everything they
//! need from the target process goes through these five calls, so the same
//! scanning code runs against the live Windows API or an in-memory double.

use crate::core::types::{Address, MemoryRegion, MemoryResult, ModuleInfo, ProcessId};
use crate::process::ProcessAccess;

/// Backend-neutral process handle value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub usize);

/// OS operations needed to attach to and scan a process
pub trait MemoryBackend: Send + Sync {
    /// Open a handle to `pid` with the requested rights
    fn open_handle(&self, pid: ProcessId, access: ProcessAccess) -> MemoryResult<RawHandle>;

    /// Release a handle returned by [`open_handle`](Self::open_handle)
    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()>;

    /// Describe the region containing `address`.
    ///
    /// An error means there is no further region to report.
    fn query_region(&self, handle: RawHandle, address: Address) -> MemoryResult<MemoryRegion>;

    /// Copy target memory at `address` into `buffer`, returning bytes copied
    fn read_bytes(&self, handle: RawHandle, address: Address, buffer: &mut [u8])
        -> MemoryResult<usize>;

    /// The target's main module
    fn main_module(&self, handle: RawHandle) -> MemoryResult<ModuleInfo>;
}
