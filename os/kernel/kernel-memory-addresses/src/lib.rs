//! # Physical and Virtual Address Types (32-bit, 4 KiB pages)
//!
//! Strongly typed wrappers for the raw addresses and frame numbers used by the
//! frame allocator, the page-table manager and the region tracker.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A byte address in physical memory. |
//! | [`VirtualAddress`]  | A byte address as seen through the page tables. |
//! | [`FrameNumber`]     | Index of a 4 KiB physical frame (`address >> 12`). |
//!
//! The machine uses classic two-level x86 paging: every virtual address splits
//! into a 10-bit directory index, a 10-bit table index and a 12-bit offset.
//!
//! ```text
//! | 31‒22     | 21‒12     | 11‒0   |
//! | directory | table     | offset |
//! ```
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0040_3123);
//! assert_eq!(va.directory_index(), 1);
//! assert_eq!(va.table_index(), 3);
//! assert_eq!(va.page_offset(), 0x123);
//!
//! let frame = FrameNumber::new(0x200);
//! assert_eq!(frame.base(), PhysicalAddress::new(0x0020_0000));
//! assert_eq!(PhysicalAddress::new(0x0020_0fff).frame(), frame);
//! ```
//!
//! ## Physical Access
//!
//! Code that has to touch a physical frame (a frame-pool bitmap, a freshly
//! allocated page directory) does so through a [`PhysMapper`]. With the
//! `sim` feature, [`sim::SimulatedRam`] provides a lazily allocated arena of
//! frames for host-side tests.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

mod frame_number;
mod phys_mapper;
mod physical_address;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
mod virtual_address;

pub use crate::frame_number::FrameNumber;
pub use crate::phys_mapper::PhysMapper;
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;

/// Size of a page (and of a physical frame) in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// log2 of [`PAGE_SIZE`]; the number of offset bits in an address.
pub const PAGE_SHIFT: u32 = 12;

/// Frames are pages seen from the physical side.
pub const FRAME_SIZE: u32 = PAGE_SIZE;

/// Align `x` down to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two.
///
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(0, 4096), 0);
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(8191, 4096), 4096);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u32, a: u32) -> u32 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two. Returns `None` if the aligned value
/// does not fit in 32 bits.
///
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(1, 4096), Some(4096));
/// assert_eq!(align_up(4096, 4096), Some(4096));
/// assert_eq!(align_up(4097, 4096), Some(8192));
/// assert_eq!(align_up(u32::MAX, 4096), None);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u32, a: u32) -> Option<u32> {
    match x.checked_add(a - 1) {
        Some(v) => Some(v & !(a - 1)),
        None => None,
    }
}

const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
};
