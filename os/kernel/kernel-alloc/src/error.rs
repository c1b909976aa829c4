use kernel_frames::ErrorClass;
use kernel_memory_addresses::VirtualAddress;
use kernel_vmem::PagingError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmPoolError {
    #[error("a region pool at {base} spanning {size:#x} bytes is not usable")]
    InvalidGeometry { base: VirtualAddress, size: u32 },
    #[error("all {capacity} region slots are in use")]
    RegionTableFull { capacity: usize },
    #[error("{requested:#x} bytes requested, {available:#x} bytes left in the pool")]
    PoolExhausted { requested: u32, available: u32 },
    #[error("no region starts at {start}")]
    UnknownRegion { start: VirtualAddress },
    #[error(transparent)]
    Paging(#[from] PagingError),
}

impl VmPoolError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::RegionTableFull { .. } | Self::PoolExhausted { .. } => ErrorClass::Exhaustion,
            Self::InvalidGeometry { .. } | Self::UnknownRegion { .. } => {
                ErrorClass::ProtocolViolation
            }
            Self::Paging(e) => e.class(),
        }
    }
}
