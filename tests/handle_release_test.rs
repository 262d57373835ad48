//! Every handle the scanner opens must be closed, whatever the exit path

use memory_macro::core::types::{
    Address, MemoryRegion, MemoryResult, ModuleInfo, ProcessId,
};
use memory_macro::memory::{
    InMemoryBackend, MemoryBackend, MemoryScanner, RawHandle, ScanOptions, SimulatedProcess,
    SimulatedRegion,
};
use memory_macro::process::{ProcessAccess, ProcessHandle};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

fn backend_with(pids: &[u32]) -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    for pid in pids {
        backend.add_process(
            *pid,
            SimulatedProcess::new()
                .with_main_module(ModuleInfo::new("target.exe", Address::new(0x1000), 0x100))
                .with_region(SimulatedRegion::readable(Address::new(0x1000), vec![7u8; 0x100])),
        );
    }
    backend
}

#[test]
fn test_detach_releases_handle() {
    let backend = backend_with(&[10]);
    let scanner = MemoryScanner::new(Arc::clone(&backend));

    assert!(scanner.attach(10));
    assert_eq!(backend.open_handles(), 1);

    scanner.detach();
    scanner.detach();
    assert_eq!(backend.open_handles(), 0);
    assert_eq!(backend.closed_total(), 1);
}

#[test]
fn test_reattach_releases_previous_handle() {
    let backend = backend_with(&[10, 11]);
    let scanner = MemoryScanner::new(Arc::clone(&backend));

    assert!(scanner.attach(10));
    assert!(scanner.attach(11));
    assert_eq!(scanner.attached_pid(), Some(11));
    assert_eq!(backend.open_handles(), 1);
    assert_eq!(backend.opened_total(), 2);
    assert_eq!(backend.closed_total(), 1);
}

#[test]
fn test_failed_reattach_leaves_scanner_detached() {
    let backend = backend_with(&[10]);
    let scanner = MemoryScanner::new(Arc::clone(&backend));

    assert!(scanner.attach(10));
    assert!(!scanner.attach(999));
    assert!(!scanner.is_attached());
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn test_drop_releases_handle() {
    let backend = backend_with(&[10]);
    {
        let scanner = MemoryScanner::new(Arc::clone(&backend));
        assert!(scanner.attach(10));
        assert_eq!(scanner.read_as_hex(Address::new(0x1000)), "07070707");
    }
    assert_eq!(backend.open_handles(), 0);
    assert_eq!(backend.opened_total(), backend.closed_total());
}

#[test]
fn test_panicking_thread_releases_handle() {
    let backend = backend_with(&[10]);
    let worker_backend = Arc::clone(&backend);

    let result = thread::spawn(move || {
        let scanner = MemoryScanner::new(worker_backend);
        assert!(scanner.attach(10));
        panic!("caller failed while attached");
    })
    .join();

    assert!(result.is_err());
    assert_eq!(backend.open_handles(), 0);
    assert_eq!(backend.closed_total(), 1);
}

#[test]
fn test_unwinding_releases_raw_process_handle() {
    let backend = backend_with(&[10]);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let handle = ProcessHandle::open_for_read(Arc::clone(&backend), 10).unwrap();
        assert!(handle.is_valid());
        panic!("boom");
    }));

    assert!(result.is_err());
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn test_explicit_close_then_drop_closes_once() {
    let backend = backend_with(&[10]);
    {
        let mut handle = ProcessHandle::open_for_read(Arc::clone(&backend), 10).unwrap();
        handle.close();
        handle.close();
        assert!(!handle.is_valid());
    }
    assert_eq!(backend.closed_total(), 1);
}

#[test]
fn test_many_attach_cycles_leak_nothing() {
    let backend = backend_with(&[10, 11]);
    let scanner = MemoryScanner::new(Arc::clone(&backend));

    for i in 0..50 {
        assert!(scanner.attach(10 + (i % 2)));
        if i % 3 == 0 {
            scanner.detach();
        }
    }
    drop(scanner);

    assert_eq!(backend.open_handles(), 0);
    assert_eq!(backend.opened_total(), 50);
    assert_eq!(backend.closed_total(), 50);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    Read(RawHandle),
    Close(RawHandle),
}

/// Parks inside its first read until the test releases it, logging every call
struct ParkingBackend {
    inner: InMemoryBackend,
    parked: AtomicBool,
    entered: Barrier,
    release: Barrier,
    calls: Mutex<Vec<Call>>,
}

impl ParkingBackend {
    fn new(inner: InMemoryBackend) -> Self {
        ParkingBackend {
            inner,
            parked: AtomicBool::new(false),
            entered: Barrier::new(2),
            release: Barrier::new(2),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl MemoryBackend for ParkingBackend {
    fn open_handle(&self, pid: ProcessId, access: ProcessAccess) -> MemoryResult<RawHandle> {
        self.inner.open_handle(pid, access)
    }

    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()> {
        self.calls.lock().unwrap().push(Call::Close(handle));
        self.inner.close_handle(handle)
    }

    fn query_region(&self, handle: RawHandle, address: Address) -> MemoryResult<MemoryRegion> {
        self.inner.query_region(handle, address)
    }

    fn read_bytes(
        &self,
        handle: RawHandle,
        address: Address,
        buffer: &mut [u8],
    ) -> MemoryResult<usize> {
        if !self.parked.swap(true, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        self.calls.lock().unwrap().push(Call::Read(handle));
        self.inner.read_bytes(handle, address, buffer)
    }

    fn main_module(&self, handle: RawHandle) -> MemoryResult<ModuleInfo> {
        self.inner.main_module(handle)
    }
}

#[test]
fn test_detach_waits_for_running_scan() {
    let mut data = vec![0u8; 64];
    data[4] = 0x5A;
    data[50] = 0x5A;
    let inner = InMemoryBackend::new();
    inner.add_process(
        10,
        SimulatedProcess::new().with_region(SimulatedRegion::readable(Address::new(0x1000), data)),
    );
    let backend = Arc::new(ParkingBackend::new(inner));
    let scanner = Arc::new(MemoryScanner::with_options(
        Arc::clone(&backend),
        ScanOptions {
            chunk_size: 16,
            ..ScanOptions::default()
        },
    ));
    assert!(scanner.attach(10));

    let scanning = Arc::clone(&scanner);
    let scan = thread::spawn(move || {
        scanning.find_all(&[0x5A], "x", Address::new(0x1000), Address::new(0x2000), 10)
    });
    backend.entered.wait();

    let detached = Arc::new(AtomicBool::new(false));
    let detaching = Arc::clone(&scanner);
    let flag = Arc::clone(&detached);
    let detach = thread::spawn(move || {
        detaching.detach();
        flag.store(true, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(50));
    assert!(!detached.load(Ordering::SeqCst));
    assert_eq!(backend.inner.open_handles(), 1);

    backend.release.wait();
    let hits = scan.join().unwrap();
    detach.join().unwrap();

    assert_eq!(hits, vec![Address::new(0x1004), Address::new(0x1032)]);
    assert!(detached.load(Ordering::SeqCst));
    assert!(!scanner.is_attached());
    assert_eq!(backend.inner.open_handles(), 0);

    // Four chunk reads on the attached handle, then its single close
    let calls = backend.calls();
    assert_eq!(calls.len(), 5);
    let handle = match calls[4] {
        Call::Close(handle) => handle,
        other => panic!("expected the close last, got {:?}", other),
    };
    assert!(calls[..4].iter().all(|c| *c == Call::Read(handle)));
}
