use kernel_frames::{ErrorClass, FrameError};
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PagingError {
    #[error("shared size {size:#x} is not page aligned or exceeds one page table")]
    InvalidSharedSize { size: u32 },
    #[error(transparent)]
    Frames(#[from] FrameError),
    #[error("segmentation fault at {address}")]
    SegmentationFault { address: VirtualAddress },
    #[error("all {capacity} region slots of the page table are taken")]
    PoolRegistryFull { capacity: usize },
    #[error("paging is not enabled")]
    PagingDisabled,
    #[error("no page table is loaded")]
    NoActiveTable,
    #[error("page table {table} is not active (CR3 holds {active})")]
    InactiveTable {
        table: FrameNumber,
        active: FrameNumber,
    },
    #[error("{address} lies in the shared identity region")]
    SharedPage { address: VirtualAddress },
    #[error("paging structure at {address} is not mapped")]
    Unmapped { address: VirtualAddress },
}

impl PagingError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Frames(e) => e.class(),
            _ => ErrorClass::ProtocolViolation,
        }
    }
}
