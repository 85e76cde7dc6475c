//! Physical and Virtual Address types.
//!
//! This module defines strong types for physical and virtual addresses to prevent
//! accidental mixing of address spaces. It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual and physical address spaces at compile time.
//! 2. **Address Manipulation:** Provides helper methods for extracting page offsets and raw values.
//! 3. **MMU Integration:** Acts as the primary interface for memory translation operations.

/// A virtual address in the Sv32 address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtAddr(pub u32);

/// A physical address in the Sv32 address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr(pub u32);

impl VirtAddr {
    /// Creates a new virtual address from a raw 32-bit value.
    #[inline(always)]
    pub fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Returns the raw 32-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u32 {
        self.0
    }

    /// Extracts the page offset (low 12 bits) from the virtual address.
    pub fn page_offset(&self) -> u32 {
        self.0 & 0xFFF
    }

    /// Extracts the megapage offset (low 22 bits) from the virtual address.
    pub fn megapage_offset(&self) -> u32 {
        self.0 & 0x3F_FFFF
    }

    /// Extracts VPN[0] (bits 12..21).
    pub fn vpn0(&self) -> u32 {
        (self.0 >> 12) & 0x3FF
    }

    /// Extracts VPN[1] (bits 22..31).
    pub fn vpn1(&self) -> u32 {
        (self.0 >> 22) & 0x3FF
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 32-bit value.
    #[inline(always)]
    pub fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Returns the raw 32-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u32 {
        self.0
    }
}
