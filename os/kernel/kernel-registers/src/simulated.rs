use crate::{ControlRegisters, Cr0, Cr3};
use core::cell::Cell;
use kernel_memory_addresses::VirtualAddress;

/// A register file in plain memory, for running paging code on the host.
///
/// Besides the registers themselves it counts CR3 writes, so tests can check
/// that a translation flush happened.
#[derive(Debug, Default)]
pub struct SimulatedRegisters {
    cr0: Cell<Cr0>,
    cr2: Cell<VirtualAddress>,
    cr3: Cell<Cr3>,
    cr3_writes: Cell<usize>,
}

impl SimulatedRegisters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch `address` into CR2, as the CPU does when it raises a page fault.
    pub fn latch_fault_address(&self, address: VirtualAddress) {
        self.cr2.set(address);
    }

    /// How many times CR3 has been written.
    #[must_use]
    pub fn cr3_writes(&self) -> usize {
        self.cr3_writes.get()
    }
}

impl ControlRegisters for SimulatedRegisters {
    fn cr0(&self) -> Cr0 {
        self.cr0.get()
    }

    unsafe fn set_cr0(&self, value: Cr0) {
        self.cr0.set(value);
    }

    fn cr2(&self) -> VirtualAddress {
        self.cr2.get()
    }

    fn cr3(&self) -> Cr3 {
        self.cr3.get()
    }

    unsafe fn set_cr3(&self, value: Cr3) {
        self.cr3.set(value);
        self.cr3_writes.set(self.cr3_writes.get() + 1);
    }
}
