use crate::{ControlRegisters, Cr0, Cr3};
use kernel_memory_addresses::VirtualAddress;

/// The executing CPU's control registers. Ring 0 only.
#[derive(Debug, Default, Copy, Clone)]
pub struct HardwareRegisters;

impl ControlRegisters for HardwareRegisters {
    fn cr0(&self) -> Cr0 {
        let cr0: u32;
        unsafe {
            core::arch::asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        }
        Cr0::from_bits(cr0)
    }

    unsafe fn set_cr0(&self, value: Cr0) {
        let cr0 = value.into_bits();
        unsafe {
            core::arch::asm!("mov cr0, {}", in(reg) cr0, options(nostack, preserves_flags));
        }
    }

    fn cr2(&self) -> VirtualAddress {
        let cr2: u32;
        unsafe {
            core::arch::asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
        }
        VirtualAddress::new(cr2)
    }

    fn cr3(&self) -> Cr3 {
        let cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Cr3::from_bits(cr3)
    }

    unsafe fn set_cr3(&self, value: Cr3) {
        let cr3 = value.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
