//! # Demand-Paged Address Space
//!
//! A [`PageTable`] owns one page directory. At construction the directory gets
//! exactly two present entries:
//!
//! | Slot | Points at | Purpose |
//! |------|-----------|---------|
//! | 0    | a fresh page table | identity map of the shared low region |
//! | 1023 | the directory itself | self-map, see [`crate::self_map`] |
//!
//! Everything else is filled lazily by [`PageTable::handle_fault`]: the first
//! touch of an address inside a registered region installs the missing page
//! table and then a data frame.
//!
//! ## Entry lifecycle
//!
//! ```text
//!   vacant ──handle_fault──► present ──free_page──► vacant
//! ```
//!
//! After paging is enabled, entries are edited through the self-map only, so
//! edits require this table to be the one in CR3.

use crate::arbiter::RegionArbiter;
use crate::entry_page::{ENTRIES_PER_PAGE, EntryPage};
use crate::error::PagingError;
use crate::fault::{FaultOutcome, TrapFrame};
use crate::page_entry::PageEntry;
use crate::paging::Paging;
use crate::self_map::{SELF_MAP_SLOT, directory_entry_address, table_entry_address, table_window};
use core::fmt;
use kernel_memory_addresses::{FrameNumber, PhysMapper, PhysicalAddress, VirtualAddress};
use kernel_registers::{ControlRegisters, Cr3};
use kernel_sync::SpinLock;
use log::{debug, trace, warn};

/// Regions a single page table can consult.
pub const MAX_REGION_POOLS: usize = 512;

struct Arbiters<'a> {
    slots: [Option<&'a dyn RegionArbiter>; MAX_REGION_POOLS],
    len: usize,
}

impl<'a> Arbiters<'a> {
    const fn new() -> Self {
        Self {
            slots: [None; MAX_REGION_POOLS],
            len: 0,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &'a dyn RegionArbiter> + '_ {
        self.slots[..self.len].iter().flatten().copied()
    }
}

/// One address space: a page directory plus the regions allowed to fault.
pub struct PageTable<'a, M: PhysMapper, C: ControlRegisters> {
    paging: &'a Paging<'a, M, C>,
    directory: FrameNumber,
    arbiters: SpinLock<Arbiters<'a>>,
    update: SpinLock<()>,
}

impl<'a, M: PhysMapper, C: ControlRegisters> PageTable<'a, M, C> {
    /// Build a directory with the shared identity map and the self-map.
    ///
    /// Takes two frames from the kernel pool.
    ///
    /// # Errors
    /// [`PagingError::Frames`] if the kernel pool cannot supply them; nothing
    /// stays allocated in that case.
    pub fn new(paging: &'a Paging<'a, M, C>) -> Result<Self, PagingError> {
        let frames = paging.frames();
        let directory = frames.get_frames(paging.kernel_pool(), 1)?;
        let table = match frames.get_frames(paging.kernel_pool(), 1) {
            Ok(table) => table,
            Err(e) => {
                frames.release_frames(directory)?;
                return Err(e.into());
            }
        };

        // Both frames are fresh from the kernel pool; nothing else refers to them.
        let shared: &mut EntryPage = unsafe { paging.mapper().frame_to_mut(table) };
        shared.clear();
        for page in 0..paging.shared_pages() {
            shared.set(page as usize, PageEntry::present_rw(FrameNumber::new(page)));
        }

        let dir: &mut EntryPage = unsafe { paging.mapper().frame_to_mut(directory) };
        dir.clear();
        dir.set(0, PageEntry::present_rw(table));
        dir.set(SELF_MAP_SLOT, PageEntry::present_rw(directory));

        debug!(
            "page table: directory {directory}, shared table {table} ({} pages)",
            paging.shared_pages()
        );
        Ok(Self {
            paging,
            directory,
            arbiters: SpinLock::new(Arbiters::new()),
            update: SpinLock::new(()),
        })
    }

    #[must_use]
    pub const fn directory_frame(&self) -> FrameNumber {
        self.directory
    }

    #[must_use]
    pub const fn paging(&self) -> &'a Paging<'a, M, C> {
        self.paging
    }

    /// `true` if this is the most recently loaded table.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.paging.current_directory() == Some(self.directory)
    }

    /// Make this the active address space (CR3).
    ///
    /// # Safety
    /// If paging is enabled, the code and data in use must be mapped in this
    /// table as well, which holds for the shared identity region.
    pub unsafe fn load(&self) {
        unsafe { self.paging.registers().set_cr3(Cr3::from_directory(self.directory)) };
        self.paging.set_current(self.directory);
        debug!("loaded page table {}", self.directory);
    }

    /// Turn on translation.
    ///
    /// # Errors
    /// [`PagingError::NoActiveTable`] if no table has been loaded.
    ///
    /// # Safety
    /// See [`Paging::enable_paging`].
    pub unsafe fn enable_paging(&self) -> Result<(), PagingError> {
        unsafe { self.paging.enable_paging() }
    }

    /// Allow faults inside `pool`'s regions to be served.
    ///
    /// # Errors
    /// [`PagingError::PoolRegistryFull`] once [`MAX_REGION_POOLS`] pools are
    /// registered.
    pub fn register_pool(&self, pool: &'a dyn RegionArbiter) -> Result<(), PagingError> {
        self.arbiters.with_lock(|arbiters| {
            let Some(slot) = arbiters.slots.get_mut(arbiters.len) else {
                warn!("page table {}: region pool list full", self.directory);
                return Err(PagingError::PoolRegistryFull {
                    capacity: MAX_REGION_POOLS,
                });
            };
            *slot = Some(pool);
            arbiters.len += 1;
            trace!("page table {}: {} region pool(s)", self.directory, arbiters.len);
            Ok(())
        })
    }

    /// Number of registered region pools.
    #[must_use]
    pub fn registered_pools(&self) -> usize {
        self.arbiters.lock().len
    }

    /// `true` if some registered pool accepts `address`.
    #[must_use]
    pub fn is_legitimate(&self, address: VirtualAddress) -> bool {
        self.arbiters
            .lock()
            .iter()
            .any(|arbiter| arbiter.is_legitimate(address))
    }

    /// Physical address `va` maps to in this table, whether or not it is active.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.paging.mmu().walk(self.directory, va)
    }

    /// Serve a page fault on this (active) address space.
    ///
    /// The faulting address comes from CR2. Faults on present pages are
    /// reported and left alone.
    ///
    /// # Errors
    /// - [`PagingError::SegmentationFault`] if no registered pool accepts the
    ///   address. Nothing is allocated.
    /// - [`PagingError::PagingDisabled`] / [`PagingError::InactiveTable`] if
    ///   this table is not the one the CPU is using.
    /// - [`PagingError::Frames`] if a pool runs dry.
    pub fn handle_fault(&self, trap: &TrapFrame) -> Result<FaultOutcome, PagingError> {
        let address = self.paging.registers().cr2();
        let code = trap.error_code;

        if !self.is_legitimate(address) {
            warn!("segmentation fault at {address} ({})", code.explain());
            return Err(PagingError::SegmentationFault { address });
        }
        if code.present() {
            trace!("ignoring fault at {address}: {}", code.explain());
            return Ok(FaultOutcome::ProtectionViolationIgnored { address });
        }
        self.require_active()?;

        let _update = self.update.lock();
        let mmu = self.paging.mmu();
        let frames = self.paging.frames();

        let pde_va = directory_entry_address(address);
        let pde = mmu
            .read_entry(pde_va)
            .ok_or(PagingError::Unmapped { address: pde_va })?;

        let mut table_frame = None;
        if !pde.present() {
            let frame = frames.get_frames(self.paging.kernel_pool(), 1)?;
            mmu.write_entry(pde_va, PageEntry::present_rw(frame))
                .ok_or(PagingError::Unmapped { address: pde_va })?;

            let window = table_window(address);
            // The table is reachable through its window only now; nothing else
            // holds a reference to it.
            let table: &mut EntryPage = unsafe { mmu.page_mut(window) }
                .ok_or(PagingError::Unmapped { address: window })?;
            table.clear();
            table_frame = Some(frame);
        }

        let pte_va = table_entry_address(address);
        let pte = mmu
            .read_entry(pte_va)
            .ok_or(PagingError::Unmapped { address: pte_va })?;

        let mut data_frame = None;
        if !pte.present() {
            let frame = frames.get_frames(self.paging.process_pool(), 1)?;
            mmu.write_entry(pte_va, PageEntry::present_rw(frame))
                .ok_or(PagingError::Unmapped { address: pte_va })?;
            data_frame = Some(frame);
        }

        let outcome = FaultOutcome::Resolved {
            address,
            table_frame,
            data_frame,
        };
        trace!("page fault {outcome}");
        Ok(outcome)
    }

    /// Unmap `page` and give its frame back to the pool it came from.
    ///
    /// Returns the released frame, or `None` if the page was not mapped. The
    /// address space is reloaded either way so no stale translation survives.
    ///
    /// # Errors
    /// - [`PagingError::SharedPage`] if `page` is identity-mapped into every
    ///   address space; those frames belong to whoever owns the low memory.
    /// - [`PagingError::PagingDisabled`] / [`PagingError::InactiveTable`] if
    ///   this table is not the one the CPU is using.
    /// - [`PagingError::Frames`] if the frame could not be released; the entry
    ///   is left in place.
    pub fn free_page(&self, page: VirtualAddress) -> Result<Option<FrameNumber>, PagingError> {
        if page.as_u32() < self.paging.shared_size() {
            warn!("free_page({page}): shared page left mapped");
            return Err(PagingError::SharedPage { address: page });
        }
        self.require_active()?;

        let released = {
            let _update = self.update.lock();
            let mmu = self.paging.mmu();
            let pte_va = table_entry_address(page.page_base());
            match mmu.read_entry(pte_va) {
                Some(pte) if pte.present() => {
                    let frame = pte.frame();
                    self.paging
                        .frames()
                        .release_frames(frame)
                        .inspect_err(|e| warn!("free_page({page}): {e}"))?;
                    mmu.write_entry(pte_va, PageEntry::vacant())
                        .ok_or(PagingError::Unmapped { address: pte_va })?;
                    Some(frame)
                }
                // No table or no page: nothing is mapped here.
                _ => None,
            }
        };

        // Reloading the active directory only flushes the TLB.
        unsafe {
            self.paging
                .registers()
                .set_cr3(Cr3::from_directory(self.directory));
        };
        trace!("free_page({page}) released {released:?}");
        Ok(released)
    }

    fn require_active(&self) -> Result<(), PagingError> {
        if !self.paging.paging_enabled() {
            return Err(PagingError::PagingDisabled);
        }
        let active = self.paging.registers().cr3().directory_frame();
        if active != self.directory {
            return Err(PagingError::InactiveTable {
                table: self.directory,
                active,
            });
        }
        Ok(())
    }
}

impl<M: PhysMapper, C: ControlRegisters> fmt::Debug for PageTable<'_, M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTable")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

const _: () = {
    assert!(ENTRIES_PER_PAGE == SELF_MAP_SLOT + 1);
};
