//! Host-side stand-in for physical memory.
//!
//! [`SimulatedRam`] owns a window of physical frames `[first, first + count)`.
//! Frames are allocated on first touch and pre-filled with a configurable byte
//! so tests can tell "explicitly initialized" apart from "happened to be zero".

use crate::{FRAME_SIZE, FrameNumber, PhysMapper, PhysicalAddress};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::{OnceCell, UnsafeCell};

/// One 4 KiB-aligned frame of simulated RAM.
#[repr(C, align(4096))]
struct RawFrame(UnsafeCell<[u8; FRAME_SIZE as usize]>);

/// A lazily populated arena of physical frames.
pub struct SimulatedRam {
    first: FrameNumber,
    fill: u8,
    frames: Vec<OnceCell<Box<RawFrame>>>,
}

impl SimulatedRam {
    /// RAM covering `count` frames starting at `first`, zero-filled.
    #[must_use]
    pub fn new(first: FrameNumber, count: u32) -> Self {
        Self::with_fill(first, count, 0)
    }

    /// RAM whose untouched bytes read as `fill`.
    #[must_use]
    pub fn with_fill(first: FrameNumber, count: u32, fill: u8) -> Self {
        let frames = (0..count).map(|_| OnceCell::new()).collect();
        Self {
            first,
            fill,
            frames,
        }
    }

    /// `true` if `frame` lies inside the simulated window.
    #[must_use]
    pub fn contains(&self, frame: FrameNumber) -> bool {
        self.slot(frame).is_some()
    }

    /// Number of frames that have been touched so far.
    #[must_use]
    pub fn touched_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.get().is_some()).count()
    }

    /// Read a single byte.
    ///
    /// # Panics
    /// If `pa` lies outside the simulated window.
    #[must_use]
    pub fn read_byte(&self, pa: PhysicalAddress) -> u8 {
        // SAFETY: a single byte is always aligned and no reference escapes.
        unsafe { *self.phys_to_mut::<u8>(pa) }
    }

    /// Write a single byte.
    ///
    /// # Panics
    /// If `pa` lies outside the simulated window.
    pub fn write_byte(&self, pa: PhysicalAddress, value: u8) {
        // SAFETY: a single byte is always aligned and no reference escapes.
        unsafe { *self.phys_to_mut::<u8>(pa) = value };
    }

    fn slot(&self, frame: FrameNumber) -> Option<&OnceCell<Box<RawFrame>>> {
        let index = frame.offset_from(self.first)?;
        self.frames.get(index as usize)
    }
}

impl PhysMapper for SimulatedRam {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let frame = pa.frame();
        let offset = pa.page_offset() as usize;
        debug_assert!(offset + size_of::<T>() <= FRAME_SIZE as usize);
        debug_assert_eq!(offset % align_of::<T>(), 0, "misaligned access at {pa}");

        let Some(slot) = self.slot(frame) else {
            panic!("physical address {pa} lies outside the simulated RAM");
        };
        let raw = slot.get_or_init(|| {
            Box::new(RawFrame(UnsafeCell::new([self.fill; FRAME_SIZE as usize])))
        });

        // SAFETY: the frame is heap-pinned for the arena's lifetime; the caller
        // upholds aliasing and type validity as per the trait contract.
        unsafe { &mut *raw.0.get().cast::<u8>().add(offset).cast::<T>() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_filled_on_first_touch() {
        let ram = SimulatedRam::with_fill(FrameNumber::new(16), 4, 0xA5);
        assert_eq!(ram.touched_frames(), 0);

        let pa = FrameNumber::new(17).base() + 8;
        assert_eq!(ram.read_byte(pa), 0xA5);
        ram.write_byte(pa, 7);
        assert_eq!(ram.read_byte(pa), 7);
        assert_eq!(ram.touched_frames(), 1);
    }

    #[test]
    fn window_bounds_are_enforced() {
        let ram = SimulatedRam::new(FrameNumber::new(16), 4);
        assert!(ram.contains(FrameNumber::new(16)));
        assert!(ram.contains(FrameNumber::new(19)));
        assert!(!ram.contains(FrameNumber::new(15)));
        assert!(!ram.contains(FrameNumber::new(20)));
    }

    #[test]
    #[should_panic(expected = "outside the simulated RAM")]
    fn access_outside_window_panics() {
        let ram = SimulatedRam::new(FrameNumber::new(16), 4);
        let _ = ram.read_byte(FrameNumber::new(20).base());
    }
}
