//! # Virtual Memory Support
//!
//! Two-level IA-32 paging with demand faulting.
//!
//! ## What you get
//! - [`PageEntry`]: the 32-bit entry layout shared by directories and tables.
//! - [`EntryPage`]: a 4 KiB-aligned page of 1024 entries.
//! - [`self_map`]: virtual addresses of paging structures via directory slot 1023.
//! - [`Mmu`]: the hardware walk in software, over a [`PhysMapper`](kernel_memory_addresses::PhysMapper).
//! - [`Paging`]: which frame pools back paging structures and data.
//! - [`PageTable`]: one address space with a page-fault handler.
//!
//! ## IA-32 Virtual Address → Physical Address Walk
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | directory | table | offset |
//!
//!  CR3 → directory → table → 4 KiB frame
//!          │          │
//!          │          └─► PTE: maps one page
//!          └────────────► PDE: points at a page table
//! ```
//!
//! Each level has 1024 four-byte entries, so one page table covers 4 MiB.
//!
//! ## Demand Paging
//!
//! A fresh [`PageTable`] only maps the shared low region and itself. Regions
//! handed out by a region allocator are registered as [`RegionArbiter`]s; the
//! first touch of such an address raises a page fault, and
//! [`PageTable::handle_fault`] installs a page table (from the kernel pool) and
//! a data frame (from the process pool) as needed.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod arbiter;
mod entry_page;
mod error;
mod fault;
mod mmu;
mod page_entry;
mod page_table;
mod paging;
pub mod self_map;

pub use crate::arbiter::RegionArbiter;
pub use crate::entry_page::{DirectoryIndex, ENTRIES_PER_PAGE, EntryPage, TableIndex};
pub use crate::error::PagingError;
pub use crate::fault::{FaultOutcome, PageFaultError, TrapFrame};
pub use crate::mmu::Mmu;
pub use crate::page_entry::PageEntry;
pub use crate::page_table::{MAX_REGION_POOLS, PageTable};
pub use crate::paging::{MAX_SHARED_SIZE, Paging};
