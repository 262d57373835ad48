//! Process handle management
//!
//! A [`ProcessHandle`] is the exclusive owner of one OS handle to the target
//! process. It is opened and closed through a [`MemoryBackend`].
//!
//! [`MemoryBackend`]: crate::memory::MemoryBackend

pub mod handle;

pub use handle::{ProcessAccess, ProcessHandle};
