use bitfield_struct::bitfield;
use kernel_memory_addresses::FrameNumber;

/// A 32-bit x86 page-directory or page-table entry.
///
/// Both levels share one layout. A directory entry points at a page table; a
/// table entry maps a 4 KiB page.
///
/// | Bits  | Name    | Meaning |
/// |-------|---------|---------|
/// | 0     | `P`     | Present |
/// | 1     | `RW`    | Writable |
/// | 2     | `US`    | User-mode accessible |
/// | 3     | `PWT`   | Write-through |
/// | 4     | `PCD`   | Cache disable |
/// | 5     | `A`     | Accessed |
/// | 6     | `D`     | Dirty (table entries) |
/// | 7     | `PS`    | 4 MiB page (directory entries; never set here) |
/// | 8     | `G`     | Global |
/// | 9–11  | avail   | OS use |
/// | 12–31 | frame   | Physical frame number |
///
/// ```rust
/// # use kernel_vmem::PageEntry;
/// # use kernel_memory_addresses::FrameNumber;
/// let e = PageEntry::present_rw(FrameNumber::new(0x401));
/// assert_eq!(e.into_bits(), 0x0040_1003);
/// assert_eq!(PageEntry::vacant().into_bits(), 0b10);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntry {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on the first write through a table entry.
    pub dirty: bool,

    /// Page Size (PS, bit 7).
    pub large_page: bool,

    /// Global (G, bit 8).
    pub global: bool,

    /// Available for OS use (bits 9..=11).
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame number (bits 12..=31).
    #[bits(20)]
    frame_bits: u32,
}

impl PageEntry {
    /// Present, writable, supervisor-only entry for `frame`.
    #[inline]
    #[must_use]
    pub const fn present_rw(frame: FrameNumber) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_frame_bits(frame.as_u32())
    }

    /// Not present; the writable bit is kept so a later fill only flips `P`.
    #[inline]
    #[must_use]
    pub const fn vacant() -> Self {
        Self::new().with_writable(true)
    }

    #[inline]
    #[must_use]
    pub const fn frame(&self) -> FrameNumber {
        FrameNumber::new(self.frame_bits())
    }
}
