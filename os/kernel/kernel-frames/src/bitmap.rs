use crate::frame_state::{FrameState, StateQuad};
use kernel_memory_addresses::FRAME_SIZE;

/// Number of frames whose state fits into one info frame.
pub const FRAMES_PER_INFO_FRAME: u32 = FRAME_SIZE * 4;

/// The frame-state bitmap of one pool; exactly one physical frame.
#[repr(C, align(4096))]
pub struct FrameBitmap {
    quads: [u8; FRAME_SIZE as usize],
}

const _: () = {
    assert!(size_of::<FrameBitmap>() == FRAME_SIZE as usize);
    assert!(FRAMES_PER_INFO_FRAME == 16384);
};

impl FrameBitmap {
    /// State of the frame at pool offset `index`.
    #[inline]
    #[must_use]
    pub const fn get(&self, index: u32) -> FrameState {
        let (byte, slot) = Self::locate(index);
        StateQuad::from_bits(self.quads[byte]).get(slot)
    }

    #[inline]
    pub fn set(&mut self, index: u32, state: FrameState) {
        let (byte, slot) = Self::locate(index);
        let mut quad = StateQuad::from_bits(self.quads[byte]);
        quad.set(slot, state);
        self.quads[byte] = quad.into_bits();
    }

    /// Set every frame to [`FrameState::Free`].
    pub fn reset(&mut self) {
        self.quads.fill(0);
    }

    #[inline]
    const fn locate(index: u32) -> (usize, usize) {
        let index = index as usize;
        (index / StateQuad::FRAMES, index % StateQuad::FRAMES)
    }
}
