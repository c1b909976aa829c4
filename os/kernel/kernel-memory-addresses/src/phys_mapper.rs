use crate::{FrameNumber, PhysicalAddress};

/// Converts physical addresses to usable references in the current address
/// space.
///
/// Typical patterns:
/// - **Before paging / identity-mapped low memory**: the physical address is
///   the pointer.
/// - **Host tests**: an arena of frames indexed by frame number
///   (see `sim::SimulatedRam`).
///
/// # Safety
/// - `pa` must be backed by memory that is writable through this mapper.
/// - Lifetime `'a` is not tied to the mapper; the caller keeps the frame alive
///   and unaliased for `'a`.
/// - Type `T` must match the bytes at `pa`, and `pa` must be aligned for `T`.
pub trait PhysMapper {
    /// Convert a *physical* address to a mutable reference.
    ///
    /// # Safety
    /// See the trait documentation.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;

    /// Convenience wrapper for [`phys_to_mut`](Self::phys_to_mut) at the base of
    /// `frame`.
    ///
    /// # Safety
    /// See the trait documentation.
    #[inline]
    unsafe fn frame_to_mut<'a, T>(&self, frame: FrameNumber) -> &'a mut T {
        unsafe { self.phys_to_mut(frame.base()) }
    }
}
