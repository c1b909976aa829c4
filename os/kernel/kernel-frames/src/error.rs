use crate::frame_state::FrameState;
use crate::registry::PoolId;
use kernel_info::LayoutError;
use kernel_memory_addresses::FrameNumber;

/// The two ways a memory-management operation can fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A resource ran out. The caller may retry after freeing something.
    Exhaustion,
    /// The caller broke a contract. A kernel policy layer would halt here.
    ProtocolViolation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("a pool of {count} frames exceeds the {max} frames one info frame can describe")]
    PoolTooLarge { count: u32, max: u32 },
    #[error("a pool needs at least one frame")]
    EmptyPool,
    #[error("a pool of {count} frames at {base} runs past the end of the frame space")]
    PoolWraps { base: FrameNumber, count: u32 },
    #[error("info frame {info} lies inside the pool it describes")]
    InfoFrameInsidePool { info: FrameNumber },
    #[error("requested zero frames")]
    ZeroFrames,
    #[error("requested {requested} frames but only {free} are free")]
    InsufficientFrames { requested: u32, free: u32 },
    #[error("no run of {requested} contiguous free frames")]
    NoContiguousRun { requested: u32 },
    #[error("frames {first} (+{count}) lie outside the pool")]
    OutOfRange { first: FrameNumber, count: u32 },
    #[error("frame {frame} belongs to no registered pool")]
    UnknownFrame { frame: FrameNumber },
    #[error("frame {frame} is {state:?}, not the head of an allocation")]
    NotHeadOfSequence { frame: FrameNumber, state: FrameState },
    #[error("inaccessible frame {frame} inside an allocated run")]
    InaccessibleInRun { frame: FrameNumber },
    #[error("the pool registry is full")]
    RegistryFull,
    #[error("frames {first} (+{count}) overlap a registered pool")]
    OverlappingPool { first: FrameNumber, count: u32 },
    #[error("no registered pool {0:?}")]
    UnknownPool(PoolId),
    #[error("invalid memory layout: {0}")]
    InvalidLayout(#[from] LayoutError),
}

impl FrameError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InsufficientFrames { .. } | Self::NoContiguousRun { .. } | Self::RegistryFull => {
                ErrorClass::Exhaustion
            }
            _ => ErrorClass::ProtocolViolation,
        }
    }
}
