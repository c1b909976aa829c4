use crate::error::VmPoolError;
use crate::region::{MAX_REGIONS, Region, RegionTable};
use arrayvec::ArrayVec;
use core::fmt;
use kernel_frames::PoolId;
use kernel_memory_addresses::{PAGE_SIZE, PhysMapper, VirtualAddress, align_up};
use kernel_registers::ControlRegisters;
use kernel_sync::SpinLock;
use kernel_vmem::self_map::TABLE_WINDOW_BASE;
use kernel_vmem::{PageTable, PagingError, RegionArbiter};
use log::{debug, trace, warn};

/// A window of virtual address space that hands out page-granular regions.
///
/// Regions are only reserved here. Memory appears when the page table's fault
/// handler asks [`VmPool::is_legitimate`] about a touched address, and goes
/// away again in [`VmPool::release`].
///
/// The first page of the window is the pool's header and always counts as
/// in use. It is reserved but stays empty; the region table lives in the
/// struct. Regions are carved off in address order directly behind the last
/// live region; releasing a region does not make its addresses reusable until
/// every region after it is gone, too.
pub struct VmPool<'a, M: PhysMapper, C: ControlRegisters> {
    base: VirtualAddress,
    size: u32,
    frame_pool: PoolId,
    page_table: &'a PageTable<'a, M, C>,
    regions: SpinLock<RegionTable>,
}

impl<'a, M: PhysMapper, C: ControlRegisters> VmPool<'a, M, C> {
    /// A pool over `[base, base + size)` in `page_table`'s address space.
    ///
    /// The pool is not consulted on faults until [`register`](Self::register)
    /// is called.
    ///
    /// # Errors
    /// - [`VmPoolError::InvalidGeometry`] if `base` is not page aligned, the
    ///   window is smaller than a page, or it overlaps the shared identity
    ///   region at the bottom or the page-table window at the top of the
    ///   address space.
    /// - [`VmPoolError::Paging`] if `frame_pool` is not a registered pool.
    pub fn new(
        base: VirtualAddress,
        size: u32,
        frame_pool: PoolId,
        page_table: &'a PageTable<'a, M, C>,
    ) -> Result<Self, VmPoolError> {
        let end = u64::from(base.as_u32()) + u64::from(size);
        let shared = page_table.paging().shared_size();
        if !base.is_page_aligned()
            || size < PAGE_SIZE
            || base.as_u32() < shared
            || end > u64::from(TABLE_WINDOW_BASE)
        {
            return Err(VmPoolError::InvalidGeometry { base, size });
        }
        page_table
            .paging()
            .frames()
            .free_count(frame_pool)
            .map_err(PagingError::from)?;

        debug!("region pool {base}..+{size:#x} in page table {}", page_table.directory_frame());
        Ok(Self {
            base,
            size,
            frame_pool,
            page_table,
            regions: SpinLock::new(RegionTable::new(Region::new(base, PAGE_SIZE))),
        })
    }

    /// Let the page table serve faults inside this pool.
    ///
    /// # Errors
    /// [`VmPoolError::Paging`] if the page table has no room for another pool.
    pub fn register(&'a self) -> Result<(), VmPoolError>
    where
        M: 'a,
        C: 'a,
    {
        self.page_table.register_pool(self)?;
        Ok(())
    }

    /// Reserve `size` bytes, rounded up to whole pages (at least one).
    ///
    /// Returns the start of the region. Nothing is mapped yet.
    ///
    /// # Errors
    /// - [`VmPoolError::RegionTableFull`] if all region slots are taken.
    /// - [`VmPoolError::PoolExhausted`] if the region would not fit before the
    ///   end of the pool.
    pub fn allocate(&self, size: u32) -> Result<VirtualAddress, VmPoolError> {
        self.regions.with_lock(|regions| {
            if regions.is_full() {
                warn!("region pool {}: region table full", self.base);
                return Err(VmPoolError::RegionTableFull {
                    capacity: MAX_REGIONS,
                });
            }

            let start = regions.last().end();
            let available = self.end().as_u32() - start.as_u32();
            let rounded = align_up(size.max(1), PAGE_SIZE).unwrap_or(u32::MAX);
            if rounded > available {
                return Err(VmPoolError::PoolExhausted {
                    requested: rounded,
                    available,
                });
            }

            let region = Region::new(start, rounded);
            regions
                .push(region)
                .map_err(|_| VmPoolError::RegionTableFull {
                    capacity: MAX_REGIONS,
                })?;
            debug!("allocated {start}..{} ({size:#x} requested)", region.end());
            Ok(start)
        })
    }

    /// Unmap every page of the region starting at `start` and forget it.
    ///
    /// # Errors
    /// - [`VmPoolError::UnknownRegion`] if no allocated region starts there.
    /// - [`VmPoolError::Paging`] if a page could not be freed; the region
    ///   stays allocated and pages already freed stay unmapped.
    pub fn release(&self, start: VirtualAddress) -> Result<(), VmPoolError> {
        self.regions.with_lock(|regions| {
            let Some(index) = regions.position(start) else {
                warn!("region pool {}: release of unknown region {start}", self.base);
                return Err(VmPoolError::UnknownRegion { start });
            };

            let region = *regions.get(index).ok_or(VmPoolError::UnknownRegion { start })?;
            let mut freed = 0_u32;
            for page in region.pages() {
                if let Some(frame) = self.page_table.free_page(page)? {
                    trace!("released {page} (frame {frame})");
                    freed += 1;
                }
            }

            regions.remove(index);
            debug!("released {start}..{}, {freed} page(s) were backed", region.end());
            Ok(())
        })
    }

    /// `true` for the pool's base and for any address inside (or one past)
    /// a live region.
    #[must_use]
    pub fn is_legitimate(&self, address: VirtualAddress) -> bool {
        address == self.base || self.regions.lock().iter().any(|r| r.covers(address))
    }

    /// Snapshot of the allocated regions, oldest first.
    #[must_use]
    pub fn regions(&self) -> arrayvec::IntoIter<Region, MAX_REGIONS> {
        let snapshot: ArrayVec<Region, MAX_REGIONS> =
            self.regions.lock().allocated().copied().collect();
        snapshot.into_iter()
    }

    /// Number of allocated regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.lock().len() - 1
    }

    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub const fn frame_pool(&self) -> PoolId {
        self.frame_pool
    }

    #[must_use]
    pub const fn page_table(&self) -> &'a PageTable<'a, M, C> {
        self.page_table
    }

    fn end(&self) -> VirtualAddress {
        self.base + self.size
    }
}

impl<M: PhysMapper, C: ControlRegisters> RegionArbiter for VmPool<'_, M, C> {
    fn is_legitimate(&self, address: VirtualAddress) -> bool {
        Self::is_legitimate(self, address)
    }
}

impl<M: PhysMapper, C: ControlRegisters> fmt::Debug for VmPool<'_, M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmPool")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("frame_pool", &self.frame_pool)
            .field("regions", &self.region_count())
            .finish_non_exhaustive()
    }
}
