//! # Kernel Memory Configuration
//!
//! Where the frame pools live, which frames must never be handed out, and how
//! much low memory every address space shares.
//!
//! The constants in [`memory`] describe the standard machine. Code that sets up
//! pools takes a [`MemoryLayout`] value instead, so tests can describe smaller
//! machines with the same shape.
//!
//! ```rust
//! # use kernel_info::MemoryLayout;
//! let layout = MemoryLayout::STANDARD;
//! assert!(layout.validate().is_ok());
//! assert_eq!(layout.kernel_pool.start, 512);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;

use kernel_memory_addresses::{FrameNumber, PAGE_SIZE};

/// A contiguous run of physical frames: `[start, start + count)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameRange {
    pub start: u32,
    pub count: u32,
}

impl FrameRange {
    #[must_use]
    pub const fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    #[must_use]
    pub const fn first(&self) -> FrameNumber {
        FrameNumber::new(self.start)
    }

    /// One past the last frame, or `None` if the range wraps.
    #[must_use]
    pub const fn end(&self) -> Option<u32> {
        self.start.checked_add(self.count)
    }

    #[must_use]
    pub const fn contains_range(&self, other: &Self) -> bool {
        match (self.end(), other.end()) {
            (Some(end), Some(other_end)) => other.start >= self.start && other_end <= end,
            _ => false,
        }
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        match (self.end(), other.end()) {
            (Some(end), Some(other_end)) => self.start < other_end && other.start < end,
            _ => true,
        }
    }
}

/// Physical memory layout handed to pool bring-up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Frames for page directories and page tables. Holds its own bitmap.
    pub kernel_pool: FrameRange,
    /// Frames for demand-paged data.
    pub process_pool: FrameRange,
    /// Frames inside the process pool that must never be handed out.
    pub memory_hole: Option<FrameRange>,
    /// Bytes identity-mapped at the bottom of every address space.
    pub shared_size: u32,
}

/// Why a [`MemoryLayout`] was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("a frame pool has no frames")]
    EmptyPool,
    #[error("a frame pool extends past the 32-bit frame space")]
    PoolWraps,
    #[error("kernel and process pools overlap")]
    PoolsOverlap,
    #[error("the memory hole is not inside the process pool")]
    HoleOutsideProcessPool,
    #[error("the shared size is not a whole number of pages")]
    SharedSizeNotPageAligned,
}

impl MemoryLayout {
    /// The 32 MiB machine described in [`memory`].
    pub const STANDARD: Self = Self {
        kernel_pool: FrameRange::new(
            memory::KERNEL_POOL_START_FRAME,
            memory::KERNEL_POOL_SIZE,
        ),
        process_pool: FrameRange::new(
            memory::PROCESS_POOL_START_FRAME,
            memory::PROCESS_POOL_SIZE,
        ),
        memory_hole: Some(FrameRange::new(
            memory::MEM_HOLE_START_FRAME,
            memory::MEM_HOLE_SIZE,
        )),
        shared_size: memory::SHARED_SIZE,
    };

    /// Check the structural rules every layout must follow.
    ///
    /// # Errors
    /// The first rule that is broken, as a [`LayoutError`].
    pub const fn validate(&self) -> Result<(), LayoutError> {
        if self.kernel_pool.count == 0 || self.process_pool.count == 0 {
            return Err(LayoutError::EmptyPool);
        }
        if self.kernel_pool.end().is_none() || self.process_pool.end().is_none() {
            return Err(LayoutError::PoolWraps);
        }
        if self.kernel_pool.overlaps(&self.process_pool) {
            return Err(LayoutError::PoolsOverlap);
        }
        if let Some(hole) = &self.memory_hole
            && !self.process_pool.contains_range(hole)
        {
            return Err(LayoutError::HoleOutsideProcessPool);
        }
        if !self.shared_size.is_multiple_of(PAGE_SIZE) {
            return Err(LayoutError::SharedSizeNotPageAligned);
        }
        Ok(())
    }
}

const _: () = {
    assert!(MemoryLayout::STANDARD.validate().is_ok());
};
