//! Virtual addresses of paging structures through the self-referencing slot.
//!
//! Directory slot 1023 points at the directory frame. Walking through it once
//! makes every page table appear in the top 4 MiB; walking through it twice
//! makes the directory itself appear in the top 4 KiB.
//!
//! ```text
//! 0xFFC0_0000 ┌───────────────────────────────┐
//!             │ table for VA 0x0000_0000..    │  table_window(va)
//!             │ table for VA 0x0040_0000..    │
//!             │ ...                           │
//! 0xFFFF_F000 ├───────────────────────────────┤
//!             │ the directory                 │  directory_entry_address(va)
//! 0xFFFF_FFFF └───────────────────────────────┘
//! ```

use kernel_memory_addresses::{PAGE_SHIFT, VirtualAddress};

/// Directory slot that maps the directory itself.
pub const SELF_MAP_SLOT: usize = 1023;

/// Base of the 4 MiB window that holds every page table.
pub const TABLE_WINDOW_BASE: u32 = 0xFFC0_0000;

/// Where the directory appears.
pub const DIRECTORY_WINDOW: u32 = 0xFFFF_F000;

const DIRECTORY_SHIFT: u32 = 22;

/// Address of the directory entry covering `va`.
///
/// ```rust
/// # use kernel_vmem::self_map::directory_entry_address;
/// # use kernel_memory_addresses::VirtualAddress;
/// let pde = directory_entry_address(VirtualAddress::new(0x0040_0000));
/// assert_eq!(pde, VirtualAddress::new(0xFFFF_F004));
/// ```
#[inline]
#[must_use]
pub const fn directory_entry_address(va: VirtualAddress) -> VirtualAddress {
    VirtualAddress::new(DIRECTORY_WINDOW | ((va.as_u32() >> DIRECTORY_SHIFT) << 2))
}

/// Address of the table entry mapping `va`.
///
/// ```rust
/// # use kernel_vmem::self_map::table_entry_address;
/// # use kernel_memory_addresses::VirtualAddress;
/// let pte = table_entry_address(VirtualAddress::new(0x0040_3000));
/// assert_eq!(pte, VirtualAddress::new(0xFFC0_100C));
/// ```
#[inline]
#[must_use]
pub const fn table_entry_address(va: VirtualAddress) -> VirtualAddress {
    VirtualAddress::new(TABLE_WINDOW_BASE | ((va.as_u32() >> PAGE_SHIFT) << 2))
}

/// Address of the whole page table covering `va`.
#[inline]
#[must_use]
pub const fn table_window(va: VirtualAddress) -> VirtualAddress {
    VirtualAddress::new(TABLE_WINDOW_BASE | ((va.as_u32() >> DIRECTORY_SHIFT) << PAGE_SHIFT))
}

/// `true` if `va` lies in the self-mapped window, where no regions may live.
#[inline]
#[must_use]
pub const fn is_self_mapped(va: VirtualAddress) -> bool {
    va.as_u32() >= TABLE_WINDOW_BASE
}
