use crate::entry_page::ENTRIES_PER_PAGE;
use crate::error::PagingError;
use crate::mmu::Mmu;
use kernel_frames::{FramePoolRegistry, PoolId};
use kernel_memory_addresses::{FrameNumber, PAGE_SIZE, PhysMapper};
use kernel_registers::ControlRegisters;
use kernel_sync::SpinLock;
use log::{debug, info};

/// Largest identity-mapped region: what a single page table covers.
#[allow(clippy::cast_possible_truncation)]
pub const MAX_SHARED_SIZE: u32 = ENTRIES_PER_PAGE as u32 * PAGE_SIZE;

/// Machine-wide paging configuration, fixed before the first page table is
/// built.
///
/// Page directories and page tables come from `kernel_pool`, demand-paged
/// data frames from `process_pool`. The lowest `shared_size` bytes are
/// identity-mapped into every address space.
pub struct Paging<'a, M: PhysMapper, C: ControlRegisters> {
    mapper: &'a M,
    registers: &'a C,
    frames: &'a FramePoolRegistry,
    kernel_pool: PoolId,
    process_pool: PoolId,
    shared_size: u32,
    current: SpinLock<Option<FrameNumber>>,
}

impl<'a, M: PhysMapper, C: ControlRegisters> Paging<'a, M, C> {
    /// Fix the pools and the shared region for all page tables.
    ///
    /// # Errors
    /// - [`PagingError::InvalidSharedSize`] if `shared_size` is not page
    ///   aligned or larger than [`MAX_SHARED_SIZE`].
    /// - [`PagingError::Frames`] if either pool is not registered.
    pub fn init_paging(
        mapper: &'a M,
        registers: &'a C,
        frames: &'a FramePoolRegistry,
        kernel_pool: PoolId,
        process_pool: PoolId,
        shared_size: u32,
    ) -> Result<Self, PagingError> {
        if !shared_size.is_multiple_of(PAGE_SIZE) || shared_size > MAX_SHARED_SIZE {
            return Err(PagingError::InvalidSharedSize { size: shared_size });
        }
        frames.free_count(kernel_pool)?;
        frames.free_count(process_pool)?;

        debug!(
            "paging initialized: tables from {kernel_pool:?}, data from {process_pool:?}, {shared_size:#x} bytes shared"
        );
        Ok(Self {
            mapper,
            registers,
            frames,
            kernel_pool,
            process_pool,
            shared_size,
            current: SpinLock::new(None),
        })
    }

    /// Turn on address translation (CR0.PG).
    ///
    /// # Errors
    /// [`PagingError::NoActiveTable`] if no page table has been loaded.
    ///
    /// # Safety
    /// The loaded directory must map the code and data in use, which the
    /// shared identity region does for the kernel.
    pub unsafe fn enable_paging(&self) -> Result<(), PagingError> {
        if self.current_directory().is_none() {
            return Err(PagingError::NoActiveTable);
        }
        let cr0 = self.registers.cr0().with_pg_paging(true);
        unsafe { self.registers.set_cr0(cr0) };
        info!("paging enabled");
        Ok(())
    }

    #[must_use]
    pub fn paging_enabled(&self) -> bool {
        self.registers.cr0().pg_paging()
    }

    /// Directory of the most recently loaded page table.
    #[must_use]
    pub fn current_directory(&self) -> Option<FrameNumber> {
        *self.current.lock()
    }

    pub(crate) fn set_current(&self, directory: FrameNumber) {
        *self.current.lock() = Some(directory);
    }

    #[must_use]
    pub const fn mmu(&self) -> Mmu<'a, M, C> {
        Mmu::new(self.mapper, self.registers)
    }

    #[must_use]
    pub const fn mapper(&self) -> &'a M {
        self.mapper
    }

    #[must_use]
    pub const fn registers(&self) -> &'a C {
        self.registers
    }

    #[must_use]
    pub const fn frames(&self) -> &'a FramePoolRegistry {
        self.frames
    }

    #[must_use]
    pub const fn kernel_pool(&self) -> PoolId {
        self.kernel_pool
    }

    #[must_use]
    pub const fn process_pool(&self) -> PoolId {
        self.process_pool
    }

    #[must_use]
    pub const fn shared_size(&self) -> u32 {
        self.shared_size
    }

    /// Pages identity-mapped at the bottom of every address space.
    #[must_use]
    pub const fn shared_pages(&self) -> u32 {
        self.shared_size / PAGE_SIZE
    }
}
