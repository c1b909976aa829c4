//! # Memory Layout
//!
//! Physical placement of the two frame pools on a 32 MiB machine.
//!
//! ```text
//! 0x0000_0000 ┌──────────────────────────┐ ┐
//!             │ low memory, kernel image │ │ identity-mapped in every
//! 0x0020_0000 ├──────────────────────────┤ │ address space (SHARED_SIZE)
//!             │ kernel pool  (2 MiB)     │ │
//! 0x0040_0000 ├──────────────────────────┤ ┘
//!             │ process pool (28 MiB)    │
//! 0x00F0_0000 │   ├ memory hole (1 MiB)  │  never handed out
//! 0x0100_0000 │   ┘                      │
//! 0x0200_0000 └──────────────────────────┘
//! ```
//!
//! The kernel pool is reached through the shared identity map, so region
//! pools never lie below `SHARED_SIZE`.

use kernel_memory_addresses::PAGE_SIZE;

/// Bytes per physical frame.
pub const FRAME_SIZE: u32 = PAGE_SIZE;

/// First frame of the kernel pool (2 MiB).
pub const KERNEL_POOL_START_FRAME: u32 = (2 << 20) / FRAME_SIZE;

/// Frames in the kernel pool (2 MiB worth).
pub const KERNEL_POOL_SIZE: u32 = (2 << 20) / FRAME_SIZE;

/// First frame of the process pool (4 MiB).
pub const PROCESS_POOL_START_FRAME: u32 = (4 << 20) / FRAME_SIZE;

/// Frames in the process pool (28 MiB worth).
pub const PROCESS_POOL_SIZE: u32 = (28 << 20) / FRAME_SIZE;

/// First frame of the hole at 15 MiB.
pub const MEM_HOLE_START_FRAME: u32 = (15 << 20) / FRAME_SIZE;

/// Frames in the memory hole (1 MiB worth).
pub const MEM_HOLE_SIZE: u32 = (1 << 20) / FRAME_SIZE;

/// Low memory identity-mapped into every address space.
pub const SHARED_SIZE: u32 = 4 << 20;

const _: () = {
    assert!(KERNEL_POOL_START_FRAME + KERNEL_POOL_SIZE <= PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME >= PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME + MEM_HOLE_SIZE <= PROCESS_POOL_START_FRAME + PROCESS_POOL_SIZE);
    assert!(SHARED_SIZE.is_multiple_of(FRAME_SIZE));
    // One page table covers 4 MiB; the shared region lives in directory slot 0.
    assert!(SHARED_SIZE <= 1024 * FRAME_SIZE);
};
