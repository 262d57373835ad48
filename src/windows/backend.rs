//! [`MemoryBackend`] over the live Windows API

use super::bindings::{kernel32, psapi};
use crate::core::types::{Address, MemoryRegion, MemoryResult, ModuleInfo, ProcessId};
use crate::memory::backend::{MemoryBackend, RawHandle};
use crate::process::ProcessAccess;
use winapi::um::winnt::HANDLE;

/// Backend that talks to real processes through kernel32 and psapi
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> Self {
        WindowsBackend
    }
}

fn to_os(handle: RawHandle) -> HANDLE {
    handle.0 as HANDLE
}

impl MemoryBackend for WindowsBackend {
    fn open_handle(&self, pid: ProcessId, access: ProcessAccess) -> MemoryResult<RawHandle> {
        kernel32::open_process(pid, access.value()).map(|h| RawHandle(h as usize))
    }

    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()> {
        unsafe { kernel32::close_handle(to_os(handle)) }
    }

    fn query_region(&self, handle: RawHandle, address: Address) -> MemoryResult<MemoryRegion> {
        let mbi = unsafe { kernel32::virtual_query_ex(to_os(handle), address.as_usize())? };
        Ok(MemoryRegion {
            base_address: Address::new(mbi.BaseAddress as usize),
            size: mbi.RegionSize,
            state: mbi.State,
            protection: mbi.Protect,
        })
    }

    fn read_bytes(
        &self,
        handle: RawHandle,
        address: Address,
        buffer: &mut [u8],
    ) -> MemoryResult<usize> {
        unsafe { kernel32::read_process_memory(to_os(handle), address.as_usize(), buffer) }
    }

    fn main_module(&self, handle: RawHandle) -> MemoryResult<ModuleInfo> {
        unsafe {
            let process = to_os(handle);
            let modules = psapi::enum_process_modules(process)?;
            let main = *modules.first().ok_or_else(|| {
                crate::core::types::MemoryError::WindowsApi("Process has no modules".to_string())
            })?;
            let info = psapi::get_module_information(process, main)?;
            let name = psapi::get_module_base_name(process, main).unwrap_or_default();
            Ok(ModuleInfo::new(
                name,
                Address::new(info.lpBaseOfDll as usize),
                info.SizeOfImage as usize,
            ))
        }
    }
}
