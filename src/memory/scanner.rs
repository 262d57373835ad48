//! AOB scanning over the regions of an attached process

use crate::core::types::{Address, MemoryRegion, ProcessId, SENTINEL_HEX};
use crate::memory::backend::MemoryBackend;
use crate::memory::pattern::{matches, Pattern};
use crate::process::ProcessHandle;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Bytes read per `read_bytes` call while walking a region
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Result cap used by [`MemoryScanner::find_all`] callers that have no preference
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Scan end used when the target reports no main module
const FALLBACK_END: usize = 0x7FFF_FFFF;

/// Options for memory scanning
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Size of each chunk read from a region. Matches that straddle two
    /// chunks are not reported, so anything other than [`CHUNK_SIZE`] changes
    /// results; only tests set it.
    pub chunk_size: usize,
    /// Result cap for the `find_*_pattern` conveniences
    pub max_results: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            chunk_size: CHUNK_SIZE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Pattern scanner bound to at most one target process at a time.
///
/// Every public operation takes the instance lock for its whole duration, so
/// attach and detach never interleave with a scan. Failures never escape:
/// they surface as `false`, `None`, an empty `Vec` or the `"00000000"`
/// sentinel, and are logged.
pub struct MemoryScanner<B: MemoryBackend> {
    backend: Arc<B>,
    options: ScanOptions,
    attachment: Mutex<Option<ProcessHandle<B>>>,
}

impl<B: MemoryBackend> MemoryScanner<B> {
    /// Create a detached scanner
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_options(backend, ScanOptions::default())
    }

    pub fn with_options(backend: Arc<B>, options: ScanOptions) -> Self {
        let options = ScanOptions {
            chunk_size: options.chunk_size.max(1),
            ..options
        };
        MemoryScanner {
            backend,
            options,
            attachment: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProcessHandle<B>>> {
        self.attachment.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach to `pid`, replacing any current attachment.
    ///
    /// Returns `false` and stays detached when the process cannot be opened.
    pub fn attach(&self, pid: ProcessId) -> bool {
        let mut attachment = self.lock();
        Self::release(&mut attachment);

        match ProcessHandle::open_for_read(Arc::clone(&self.backend), pid) {
            Ok(handle) => {
                info!(pid, "Attached to process");
                *attachment = Some(handle);
                true
            }
            Err(e) => {
                warn!(pid, error = %e, "Failed to open process");
                false
            }
        }
    }

    /// Release the current attachment; a no-op when detached
    pub fn detach(&self) {
        let mut attachment = self.lock();
        Self::release(&mut attachment);
    }

    fn release(attachment: &mut Option<ProcessHandle<B>>) {
        if let Some(mut handle) = attachment.take() {
            handle.close();
            info!(pid = handle.pid(), "Detached from process");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    pub fn attached_pid(&self) -> Option<ProcessId> {
        self.lock().as_ref().map(|h| h.pid())
    }

    /// First address matching `pattern`/`mask`, or `None`.
    ///
    /// A null `start`/`end` selects the main module range.
    pub fn find_first(&self, pattern: &[u8], mask: &str, start: Address, end: Address) -> Option<Address> {
        self.find_all(pattern, mask, start, end, 1).into_iter().next()
    }

    /// Up to `max_results` matching addresses, ascending
    pub fn find_all(
        &self,
        pattern: &[u8],
        mask: &str,
        start: Address,
        end: Address,
        max_results: usize,
    ) -> Vec<Address> {
        if pattern.is_empty() || pattern.len() != mask.len() {
            warn!(
                pattern_len = pattern.len(),
                mask_len = mask.len(),
                "Invalid pattern or mask"
            );
            return Vec::new();
        }

        let attachment = self.lock();
        let handle = match attachment.as_ref() {
            Some(handle) => handle,
            None => {
                warn!("Not attached to any process");
                return Vec::new();
            }
        };

        self.scan_regions(handle, pattern, mask.as_bytes(), start, end, max_results)
    }

    /// [`find_first`](Self::find_first) over the main module for a parsed pattern
    pub fn find_pattern(&self, pattern: &Pattern) -> Option<Address> {
        self.find_first(pattern.bytes(), pattern.mask(), Address::null(), Address::null())
    }

    /// [`find_all`](Self::find_all) over the main module, capped by the configured limit
    pub fn find_all_patterns(&self, pattern: &Pattern) -> Vec<Address> {
        self.find_all(
            pattern.bytes(),
            pattern.mask(),
            Address::null(),
            Address::null(),
            self.options.max_results,
        )
    }

    /// The little-endian `u32` at `address` as eight upper-case hex digits.
    ///
    /// Any failure yields `"00000000"`.
    pub fn read_as_hex(&self, address: Address) -> String {
        match self.read_bytes(address, 4) {
            Some(bytes) => {
                let mut word = [0u8; 4];
                word.copy_from_slice(&bytes);
                format!("{:08X}", u32::from_le_bytes(word))
            }
            None => SENTINEL_HEX.to_string(),
        }
    }

    /// Exactly `len` bytes at `address`, or `None` on a failed or short read
    pub fn read_bytes(&self, address: Address, len: usize) -> Option<Vec<u8>> {
        let attachment = self.lock();
        let handle = attachment.as_ref()?;

        let mut buffer = vec![0u8; len];
        match handle.read_memory(address, &mut buffer) {
            Ok(read) if read == len => Some(buffer),
            Ok(read) => {
                debug!(%address, read, expected = len, "Short read");
                None
            }
            Err(e) => {
                debug!(%address, error = %e, "Read failed");
                None
            }
        }
    }

    /// Resolve null bounds against the main module.
    ///
    /// A null `end` becomes the module's image size taken as an address, not
    /// `base + size`; only when `start` is null too does it move to the base.
    fn scan_range(&self, handle: &ProcessHandle<B>, start: Address, end: Address) -> (Address, Address) {
        if !end.is_null() {
            return (start, end);
        }

        match handle.main_module() {
            Ok(module) => {
                let start = if start.is_null() { module.base_address } else { start };
                (start, Address::new(module.size))
            }
            Err(e) => {
                debug!(error = %e, "Main module unavailable, scanning up to fallback end");
                (start, Address::new(FALLBACK_END))
            }
        }
    }

    fn scan_regions(
        &self,
        handle: &ProcessHandle<B>,
        pattern: &[u8],
        mask: &[u8],
        start: Address,
        end: Address,
        max_results: usize,
    ) -> Vec<Address> {
        let mut results = Vec::new();
        if max_results == 0 {
            return results;
        }

        let (start, end) = self.scan_range(handle, start, end);
        debug!(%start, %end, pattern_len = pattern.len(), "Scanning regions");

        let mut buffer = vec![0u8; self.options.chunk_size];
        let mut cursor = start;

        while cursor < end && results.len() < max_results {
            let region = match handle.query_region(cursor) {
                Ok(region) => region,
                Err(e) => {
                    debug!(%cursor, error = %e, "Region query ended the walk");
                    break;
                }
            };

            if region.is_scannable() {
                self.scan_region(handle, &region, pattern, mask, &mut buffer, max_results, &mut results);
            }

            let next = region.end_address();
            if next <= cursor {
                break;
            }
            cursor = next;
        }

        for address in &results {
            debug!(%address, "Found pattern");
        }
        results
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_region(
        &self,
        handle: &ProcessHandle<B>,
        region: &MemoryRegion,
        pattern: &[u8],
        mask: &[u8],
        buffer: &mut [u8],
        max_results: usize,
        results: &mut Vec<Address>,
    ) {
        let mut offset = 0;

        while offset < region.size && results.len() < max_results {
            let chunk_base = region.base_address.add(offset);
            let to_read = buffer.len().min(region.size - offset);

            let read = match handle.read_memory(chunk_base, &mut buffer[..to_read]) {
                Ok(read) => read,
                Err(e) => {
                    debug!(region = %region.base_address, error = %e, "Skipping unreadable region");
                    return;
                }
            };

            let chunk = &buffer[..read];
            if chunk.len() >= pattern.len() {
                for o in 0..=chunk.len() - pattern.len() {
                    if matches(chunk, o, pattern, mask) {
                        results.push(chunk_base.add(o));
                        if results.len() >= max_results {
                            return;
                        }
                    }
                }
            }

            offset += to_read;
        }
    }
}

impl<B: MemoryBackend> Drop for MemoryScanner<B> {
    fn drop(&mut self) {
        let attachment = self
            .attachment
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        Self::release(attachment);
    }
}
