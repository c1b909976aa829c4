//! One 4 KiB frame of page entries, used for both paging levels.

use crate::page_entry::PageEntry;
use kernel_memory_addresses::{FRAME_SIZE, VirtualAddress};

/// Entries per directory or table page.
pub const ENTRIES_PER_PAGE: usize = 1024;

/// Index into a page directory (VA bits `[31:22]`).
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryIndex(u16);

/// Index into a page table (VA bits `[21:12]`).
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

macro_rules! entry_index {
    ($ty:ident, $extract:ident) => {
        impl $ty {
            /// The slot `va` uses at this level.
            #[inline]
            #[must_use]
            #[allow(clippy::cast_possible_truncation)]
            pub const fn of(va: VirtualAddress) -> Self {
                Self(va.$extract() as u16)
            }

            /// ### Debug assertions
            /// Asserts `v < 1024`.
            #[inline]
            #[must_use]
            pub const fn new(v: u16) -> Self {
                debug_assert!((v as usize) < ENTRIES_PER_PAGE);
                Self(v)
            }

            #[inline]
            #[must_use]
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entry_index!(DirectoryIndex, directory_index);
entry_index!(TableIndex, table_index);

/// A page directory or a page table.
///
/// The directory's last slot points at the directory itself, so the same type
/// serves both levels.
#[repr(C, align(4096))]
pub struct EntryPage {
    entries: [u32; ENTRIES_PER_PAGE],
}

const _: () = {
    assert!(size_of::<EntryPage>() == FRAME_SIZE as usize);
};

impl EntryPage {
    #[inline]
    #[must_use]
    pub const fn get(&self, i: usize) -> PageEntry {
        PageEntry::from_bits(self.entries[i])
    }

    #[inline]
    pub const fn set(&mut self, i: usize, e: PageEntry) {
        self.entries[i] = e.into_bits();
    }

    /// Make every entry [`PageEntry::vacant`].
    pub fn clear(&mut self) {
        self.entries.fill(PageEntry::vacant().into_bits());
    }
}
