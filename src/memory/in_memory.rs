//! In-memory backend that simulates target processes
//!
//! Regions are plain byte vectors at fixed base addresses. Region queries
//! behave like `VirtualQueryEx` with one byte pages: a query inside a region
//! reports the rest of that region, a query inside a gap reports a free span
//! up to the next region, and a query past the last region fails. Handle
//! bookkeeping is exposed so tests can assert that nothing leaks.

use crate::core::types::{
    Address, MemoryError, MemoryRegion, MemoryResult, ModuleInfo, ProcessId, Protection,
    MEM_COMMIT, MEM_FREE, MEM_RESERVE,
};
use crate::memory::backend::{MemoryBackend, RawHandle};
use crate::process::ProcessAccess;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One simulated region
#[derive(Debug, Clone)]
pub struct SimulatedRegion {
    pub base_address: Address,
    pub state: u32,
    pub protection: u32,
    pub data: Vec<u8>,
    /// Region queries succeed but every read fails
    pub unreadable: bool,
}

impl SimulatedRegion {
    /// Committed read-write region
    pub fn readable(base_address: Address, data: Vec<u8>) -> Self {
        SimulatedRegion {
            base_address,
            state: MEM_COMMIT,
            protection: Protection::READWRITE,
            data,
            unreadable: false,
        }
    }

    /// Reserved region of `size` bytes
    pub fn reserved(base_address: Address, size: usize) -> Self {
        SimulatedRegion {
            base_address,
            state: MEM_RESERVE,
            protection: Protection::NOACCESS,
            data: vec![0; size],
            unreadable: true,
        }
    }

    pub fn with_protection(mut self, protection: u32) -> Self {
        self.protection = protection;
        self
    }

    /// Make every read from this region fail
    pub fn failing_reads(mut self) -> Self {
        self.unreadable = true;
        self
    }

    fn end(&self) -> usize {
        self.base_address.as_usize() + self.data.len()
    }

    fn contains(&self, address: Address) -> bool {
        address >= self.base_address && address.as_usize() < self.end()
    }
}

/// A simulated target process
#[derive(Debug, Clone, Default)]
pub struct SimulatedProcess {
    main_module: Option<ModuleInfo>,
    regions: Vec<SimulatedRegion>,
}

impl SimulatedProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_main_module(mut self, module: ModuleInfo) -> Self {
        self.main_module = Some(module);
        self
    }

    /// Add a region; regions are kept sorted by base address
    pub fn with_region(mut self, region: SimulatedRegion) -> Self {
        self.regions.push(region);
        self.regions.sort_by_key(|r| r.base_address);
        self
    }

    fn region_at(&self, address: Address) -> Option<&SimulatedRegion> {
        self.regions.iter().find(|r| r.contains(address))
    }
}

#[derive(Default)]
struct State {
    processes: HashMap<ProcessId, SimulatedProcess>,
    denied: HashSet<ProcessId>,
    open: HashMap<RawHandle, ProcessId>,
    next_handle: usize,
    opened_total: usize,
    closed_total: usize,
    read_calls: usize,
}

/// Thread-safe in-memory [`MemoryBackend`]
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_process(&self, pid: ProcessId, process: SimulatedProcess) {
        self.state().processes.insert(pid, process);
    }

    /// Refuse future opens of `pid`, as the OS does without sufficient rights
    pub fn deny(&self, pid: ProcessId) {
        self.state().denied.insert(pid);
    }

    /// Overwrite bytes inside an existing region
    pub fn write(&self, pid: ProcessId, address: Address, bytes: &[u8]) -> MemoryResult<()> {
        let mut state = self.state();
        let process = state
            .processes
            .get_mut(&pid)
            .ok_or_else(|| MemoryError::access_denied(pid, "no such process"))?;
        let region = process
            .regions
            .iter_mut()
            .find(|r| r.contains(address))
            .ok_or_else(|| MemoryError::InvalidAddress(address.to_string()))?;

        let start = address.as_usize() - region.base_address.as_usize();
        let end = start + bytes.len();
        if end > region.data.len() {
            return Err(MemoryError::InvalidAddress(address.add(bytes.len()).to_string()));
        }
        region.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Handles currently open
    pub fn open_handles(&self) -> usize {
        self.state().open.len()
    }

    pub fn opened_total(&self) -> usize {
        self.state().opened_total
    }

    pub fn closed_total(&self) -> usize {
        self.state().closed_total
    }

    /// Number of `read_bytes` calls served so far
    pub fn read_calls(&self) -> usize {
        self.state().read_calls
    }

    fn process_for<'a>(state: &'a State, handle: RawHandle) -> MemoryResult<&'a SimulatedProcess> {
        let pid = state
            .open
            .get(&handle)
            .ok_or_else(|| MemoryError::InvalidHandle(format!("Unknown handle {}", handle.0)))?;
        state
            .processes
            .get(pid)
            .ok_or_else(|| MemoryError::access_denied(*pid, "process has exited"))
    }
}

impl MemoryBackend for InMemoryBackend {
    fn open_handle(&self, pid: ProcessId, _access: ProcessAccess) -> MemoryResult<RawHandle> {
        let mut state = self.state();
        if state.denied.contains(&pid) {
            return Err(MemoryError::access_denied(pid, "access is denied"));
        }
        if !state.processes.contains_key(&pid) {
            return Err(MemoryError::access_denied(pid, "no such process"));
        }

        state.next_handle += 4;
        let handle = RawHandle(state.next_handle);
        state.open.insert(handle, pid);
        state.opened_total += 1;
        Ok(handle)
    }

    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()> {
        let mut state = self.state();
        if state.open.remove(&handle).is_none() {
            return Err(MemoryError::InvalidHandle(format!(
                "Handle {} is not open",
                handle.0
            )));
        }
        state.closed_total += 1;
        Ok(())
    }

    fn query_region(&self, handle: RawHandle, address: Address) -> MemoryResult<MemoryRegion> {
        let state = self.state();
        let process = Self::process_for(&state, handle)?;

        if let Some(region) = process.region_at(address) {
            return Ok(MemoryRegion {
                base_address: address,
                size: region.end() - address.as_usize(),
                state: region.state,
                protection: region.protection,
            });
        }

        process
            .regions
            .iter()
            .find(|r| r.base_address > address)
            .map(|next| MemoryRegion {
                base_address: address,
                size: next.base_address.as_usize() - address.as_usize(),
                state: MEM_FREE,
                protection: Protection::NOACCESS,
            })
            .ok_or_else(|| MemoryError::QueryFailed(address.to_string()))
    }

    fn read_bytes(
        &self,
        handle: RawHandle,
        address: Address,
        buffer: &mut [u8],
    ) -> MemoryResult<usize> {
        let mut state = self.state();
        state.read_calls += 1;
        let process = Self::process_for(&state, handle)?;

        let region = process
            .region_at(address)
            .filter(|r| r.state == MEM_COMMIT && !r.unreadable)
            .ok_or_else(|| MemoryError::read_failed(address, "region is not readable"))?;

        let start = address.as_usize() - region.base_address.as_usize();
        let count = buffer.len().min(region.data.len() - start);
        buffer[..count].copy_from_slice(&region.data[start..start + count]);
        Ok(count)
    }

    fn main_module(&self, handle: RawHandle) -> MemoryResult<ModuleInfo> {
        let state = self.state();
        Self::process_for(&state, handle)?
            .main_module
            .clone()
            .ok_or_else(|| MemoryError::WindowsApi("No main module".to_string()))
    }
}
