//! Software model of the two-level address translation.
//!
//! Once paging is on, the page-table code only touches paging structures
//! through virtual addresses (the self-map window), exactly like code running
//! on the CPU would. [`Mmu`] resolves those addresses the way the hardware
//! does: CR3 → directory entry → table entry → frame.

use crate::entry_page::{DirectoryIndex, TableIndex};
use crate::page_entry::PageEntry;
use kernel_memory_addresses::{FrameNumber, PhysMapper, PhysicalAddress, VirtualAddress};
use kernel_registers::ControlRegisters;

#[allow(clippy::cast_possible_truncation)]
const ENTRY_SIZE: u32 = size_of::<u32>() as u32;

pub struct Mmu<'a, M: PhysMapper, C: ControlRegisters> {
    mapper: &'a M,
    registers: &'a C,
}

impl<'a, M: PhysMapper, C: ControlRegisters> Mmu<'a, M, C> {
    #[must_use]
    pub const fn new(mapper: &'a M, registers: &'a C) -> Self {
        Self { mapper, registers }
    }

    /// Physical address `va` resolves to right now.
    ///
    /// With paging off every address is physical.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        if !self.registers.cr0().pg_paging() {
            return Some(PhysicalAddress::new(va.as_u32()));
        }
        self.walk(self.registers.cr3().directory_frame(), va)
    }

    /// Translate `va` through the directory in `directory`, ignoring CR0/CR3.
    #[must_use]
    pub fn walk(&self, directory: FrameNumber, va: VirtualAddress) -> Option<PhysicalAddress> {
        let pde = self.entry(directory, DirectoryIndex::of(va).as_usize());
        if !pde.present() {
            return None;
        }
        let pte = self.entry(pde.frame(), TableIndex::of(va).as_usize());
        if !pte.present() {
            return None;
        }
        Some(pte.frame().base() + va.page_offset())
    }

    /// Read the page entry stored at virtual address `va`.
    #[must_use]
    pub fn read_entry(&self, va: VirtualAddress) -> Option<PageEntry> {
        let pa = self.translate(va)?;
        let raw: &mut u32 = unsafe { self.mapper.phys_to_mut(pa) };
        Some(PageEntry::from_bits(*raw))
    }

    /// Store `entry` at virtual address `va`; `None` if `va` is unmapped.
    pub fn write_entry(&self, va: VirtualAddress, entry: PageEntry) -> Option<()> {
        let pa = self.translate(va)?;
        let raw: &mut u32 = unsafe { self.mapper.phys_to_mut(pa) };
        *raw = entry.into_bits();
        Some(())
    }

    /// Borrow the page at `va` as a `T`.
    ///
    /// # Safety
    /// `va` must be page aligned, `T` must fit in one page, and no other
    /// reference to that page may be alive while the returned one is used.
    pub unsafe fn page_mut<'p, T>(&self, va: VirtualAddress) -> Option<&'p mut T> {
        debug_assert!(va.is_page_aligned());
        let pa = self.translate(va)?;
        Some(unsafe { self.mapper.phys_to_mut(pa) })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn entry(&self, page: FrameNumber, index: usize) -> PageEntry {
        let pa = page.base() + index as u32 * ENTRY_SIZE;
        let raw: &mut u32 = unsafe { self.mapper.phys_to_mut(pa) };
        PageEntry::from_bits(*raw)
    }
}
