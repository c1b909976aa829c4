use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

/// Page-fault error code (IA-32).
///
/// Reference: Intel SDM Vol. 3A, §6.15 "Page-Fault Exception (#PF)".
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageFaultError {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read, 1 = write.
    pub write: bool, // bit 1

    /// 0 = supervisor, 1 = user mode.
    pub user: bool, // bit 2

    /// 1 = reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch.
    pub instruction_fetch: bool, // bit 4

    #[bits(27)]
    __: u32,
}

impl PageFaultError {
    #[must_use]
    pub const fn explain(&self) -> &'static str {
        if !self.present() {
            "Non-present page (not yet backed by a frame)"
        } else if self.reserved_bit() {
            "Reserved bit set in a paging structure"
        } else if self.instruction_fetch() {
            "Instruction fetch on protected page"
        } else if self.write() {
            if self.user() {
                "User-mode write to protected page"
            } else {
                "Write access to protected page"
            }
        } else {
            "Read access to protected page"
        }
    }
}

/// What the trap dispatcher hands to the page-fault handler.
///
/// The faulting address is not part of it; the handler reads it from CR2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TrapFrame {
    pub error_code: PageFaultError,
}

impl TrapFrame {
    #[must_use]
    pub const fn new(error_code: u32) -> Self {
        Self {
            error_code: PageFaultError::from_bits(error_code),
        }
    }
}

/// How a page fault was handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The mapping for `address` is now present.
    Resolved {
        address: VirtualAddress,
        /// Page table installed for the fault, if the directory entry was empty.
        table_frame: Option<FrameNumber>,
        /// Data frame installed for the fault, if the table entry was empty.
        data_frame: Option<FrameNumber>,
    },
    /// The page was present; protection faults are not handled.
    ProtectionViolationIgnored { address: VirtualAddress },
}

impl fmt::Display for FaultOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved {
                address,
                table_frame,
                data_frame,
            } => {
                write!(f, "{address}: ")?;
                match (table_frame, data_frame) {
                    (None, None) => f.write_str("already mapped"),
                    (Some(t), Some(d)) => write!(f, "table {t}, data {d}"),
                    (Some(t), None) => write!(f, "table {t}"),
                    (None, Some(d)) => write!(f, "data {d}"),
                }
            }
            Self::ProtectionViolationIgnored { address } => {
                write!(f, "{address}: protection violation ignored")
            }
        }
    }
}
