//! # Contiguous Physical Frame Pools
//!
//! A [`FramePool`] manages one contiguous range of 4 KiB frames with a 2-bit
//! state per frame, stored in a single "info" frame:
//!
//! | State | Bits | Meaning |
//! |-------|------|---------|
//! | [`FrameState::Free`]           | `00` | available |
//! | [`FrameState::Used`]           | `01` | inside an allocated run |
//! | [`FrameState::HeadOfSequence`] | `10` | first frame of an allocated run |
//! | [`FrameState::Inaccessible`]   | `11` | never handed out |
//!
//! One info frame holds 4096 × 4 = 16384 states, which bounds the pool size.
//!
//! Releasing only needs the first frame of a run: the [`FramePoolRegistry`]
//! finds the owning pool by range, and the pool finds the end of the run by
//! scanning to the next free or head frame.
//!
//! ```rust
//! # use kernel_frames::*;
//! # use kernel_memory_addresses::{FrameNumber, sim::SimulatedRam};
//! let ram = SimulatedRam::new(FrameNumber::new(0x200), 1024);
//! let mut registry = FramePoolRegistry::new();
//! let pool = unsafe { registry.create_pool(&ram, FrameNumber::new(0x200), 1024, None) }?;
//!
//! let run = registry.get_frames(pool, 3)?;
//! assert_eq!(run, FrameNumber::new(0x201));
//! assert_eq!(registry.release_frames(run)?, 3);
//! # Ok::<(), FrameError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bitmap;
mod boot;
mod error;
mod frame_state;
mod pool;
mod registry;

pub use crate::bitmap::{FRAMES_PER_INFO_FRAME, FrameBitmap};
pub use crate::boot::{BootPools, bring_up};
pub use crate::error::{ErrorClass, FrameError};
pub use crate::frame_state::{FrameState, StateQuad};
pub use crate::pool::FramePool;
pub use crate::registry::{FramePoolRegistry, MAX_POOLS, PoolId};
