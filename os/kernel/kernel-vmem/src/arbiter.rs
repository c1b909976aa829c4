use kernel_memory_addresses::VirtualAddress;

/// Decides whether a faulting address belongs to a live region.
///
/// The page-fault handler only backs an address with memory if at least one
/// registered arbiter accepts it.
pub trait RegionArbiter {
    fn is_legitimate(&self, address: VirtualAddress) -> bool;
}
