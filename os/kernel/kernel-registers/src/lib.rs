//! # Typed IA-32 Control Registers
//!
//! The page-table manager needs exactly three control registers:
//!
//! | Register | Use |
//! |----------|-----|
//! | [`Cr0`]  | `PG` (bit 31) turns paging on. |
//! | `CR2`    | Linear address that caused the last page fault. |
//! | [`Cr3`]  | Physical base of the active page directory. |
//!
//! Access goes through the [`ControlRegisters`] trait so the same paging code
//! runs against the real CPU (feature `asm`, 32-bit x86 only) and against
//! [`SimulatedRegisters`] in host tests.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod cr0;
mod cr3;
#[cfg(all(feature = "asm", target_arch = "x86"))]
mod hardware;
mod simulated;

pub use crate::cr0::Cr0;
pub use crate::cr3::Cr3;
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub use crate::hardware::HardwareRegisters;
pub use crate::simulated::SimulatedRegisters;

use kernel_memory_addresses::VirtualAddress;

/// Accessors for the paging-related control registers.
pub trait ControlRegisters {
    fn cr0(&self) -> Cr0;

    /// # Safety
    /// Changing `PG` switches every subsequent access from physical to virtual
    /// addressing; the active directory must map the executing code.
    unsafe fn set_cr0(&self, value: Cr0);

    /// Faulting linear address of the most recent page fault.
    fn cr2(&self) -> VirtualAddress;

    fn cr3(&self) -> Cr3;

    /// Writing CR3 also invalidates all non-global TLB entries.
    ///
    /// # Safety
    /// The new directory must be a valid translation structure.
    unsafe fn set_cr3(&self, value: Cr3);
}
