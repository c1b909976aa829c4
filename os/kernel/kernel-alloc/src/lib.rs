//! # Virtual Region Pools
//!
//! A [`VmPool`] carves page-granular regions out of a window of virtual
//! address space. Reserving a region maps nothing; the page table's fault
//! handler asks every registered pool whether a touched address is
//! legitimate and only then backs it with a frame.
//!
//! ```text
//!  base                                              base + size
//!   ┌────────┬──────────┬──────┬───────────────────────┐
//!   │ header │ region 1 │ reg 2│        free           │
//!   └────────┴──────────┴──────┴───────────────────────┘
//!              allocate() appends here ───►
//! ```
//!
//! Releasing a region unmaps its pages (returning their frames) and closes
//! the gap in the region table.
//!
//! ## Lock order
//! A page-table fault takes the page table's pool list, then each pool's
//! region table. [`VmPool::release`] holds the region table while it calls
//! [`PageTable::free_page`](kernel_vmem::PageTable::free_page), which never
//! touches the pool list.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod error;
mod region;
mod vm_pool;

pub use crate::error::VmPoolError;
pub use crate::region::{MAX_REGIONS, Region, RegionTable};
pub use crate::vm_pool::VmPool;
