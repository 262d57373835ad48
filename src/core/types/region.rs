//! Memory region and module descriptions reported by a backend

use super::Address;
use serde::{Deserialize, Serialize};

/// Commit state of committed memory
pub const MEM_COMMIT: u32 = 0x1000;
/// Reserved, not committed
pub const MEM_RESERVE: u32 = 0x2000;
/// Free address space
pub const MEM_FREE: u32 = 0x10000;

/// Page protection constants
pub struct Protection;

impl Protection {
    pub const NOACCESS: u32 = 0x01;
    pub const READONLY: u32 = 0x02;
    pub const READWRITE: u32 = 0x04;
    pub const WRITECOPY: u32 = 0x08;
    pub const EXECUTE: u32 = 0x10;
    pub const EXECUTE_READ: u32 = 0x20;
    pub const EXECUTE_READWRITE: u32 = 0x40;
    pub const EXECUTE_WRITECOPY: u32 = 0x80;
    pub const GUARD: u32 = 0x100;

    /// Base protections the scanner is allowed to read
    pub const SCANNABLE: [u32; 4] = [
        Self::READONLY,
        Self::READWRITE,
        Self::EXECUTE_READ,
        Self::EXECUTE_READWRITE,
    ];
}

/// One span of the target's address space, as reported by a region query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub base_address: Address,
    pub size: usize,
    pub state: u32,
    pub protection: u32,
}

impl MemoryRegion {
    /// Address one past the end of the region
    pub fn end_address(&self) -> Address {
        self.base_address.add(self.size)
    }

    pub fn is_committed(&self) -> bool {
        self.state == MEM_COMMIT
    }

    /// Committed, not a guard page, and readable without side effects
    pub fn is_scannable(&self) -> bool {
        self.is_committed()
            && self.protection & Protection::GUARD == 0
            && Protection::SCANNABLE.contains(&(self.protection & 0xFF))
    }
}

/// The main module of an attached process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub base_address: Address,
    pub size: usize,
}

impl ModuleInfo {
    /// Creates a new ModuleInfo
    pub fn new(name: impl Into<String>, base_address: Address, size: usize) -> Self {
        ModuleInfo {
            name: name.into(),
            base_address,
            size,
        }
    }

    /// Gets the end address of the module
    pub fn end_address(&self) -> Address {
        self.base_address.add(self.size)
    }

    /// Checks if an address is within this module
    pub fn contains_address(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(state: u32, protection: u32) -> MemoryRegion {
        MemoryRegion {
            base_address: Address::new(0x1000),
            size: 0x2000,
            state,
            protection,
        }
    }

    #[test]
    fn test_scannable_protections() {
        for protection in Protection::SCANNABLE {
            assert!(region(MEM_COMMIT, protection).is_scannable());
        }
        assert!(!region(MEM_COMMIT, Protection::NOACCESS).is_scannable());
        assert!(!region(MEM_COMMIT, Protection::EXECUTE).is_scannable());
        assert!(!region(MEM_COMMIT, Protection::WRITECOPY).is_scannable());
        assert!(!region(MEM_COMMIT, Protection::READWRITE | Protection::GUARD).is_scannable());
    }

    #[test]
    fn test_uncommitted_is_skipped() {
        assert!(!region(MEM_RESERVE, Protection::READWRITE).is_scannable());
        assert!(!region(MEM_FREE, Protection::READWRITE).is_scannable());
    }

    #[test]
    fn test_region_end() {
        assert_eq!(region(MEM_COMMIT, 0).end_address(), Address::new(0x3000));
    }

    #[test]
    fn test_module_contains() {
        let module = ModuleInfo::new("game.exe", Address::new(0x400000), 0x1000);
        assert!(module.contains_address(Address::new(0x400500)));
        assert!(!module.contains_address(Address::new(0x401000)));
        assert_eq!(module.end_address(), Address::new(0x401000));
    }
}
