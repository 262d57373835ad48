//! Windows API layer
//!
//! All unsafe FFI calls are contained in [`bindings`]; [`WindowsBackend`]
//! exposes them to the scanner through the backend trait.

pub mod backend;
pub mod bindings;

pub use backend::WindowsBackend;
