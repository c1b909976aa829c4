use bitfield_struct::bitfield;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress};

/// CR3: Page-Directory Base Register (32-bit paging).
///
/// Holds the physical frame of the active page directory plus cache-control
/// flags for directory accesses.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Cr3 {
    /// Bits 0–2: Reserved.
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3: PWT: Page-level Write-Through for the directory.
    pub pwt: bool,

    /// Bit 4: PCD: Page-level Cache Disable for the directory.
    pub pcd: bool,

    /// Bits 5–11: Reserved.
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–31: page directory physical base >> 12.
    #[bits(20)]
    directory_frame_bits: u32,
}

impl Cr3 {
    /// Build a `Cr3` value for the directory held in `frame`, caching enabled.
    #[must_use]
    pub const fn from_directory(frame: FrameNumber) -> Self {
        Self::new().with_directory_frame_bits(frame.as_u32())
    }

    /// Frame of the active page directory.
    #[must_use]
    pub const fn directory_frame(&self) -> FrameNumber {
        FrameNumber::new(self.directory_frame_bits())
    }

    /// Physical address of the active page directory.
    #[must_use]
    pub const fn directory(&self) -> PhysicalAddress {
        self.directory_frame().base()
    }
}
