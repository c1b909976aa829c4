use bitfield_struct::bitfield;

/// Allocation state of one physical frame, stored in two bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameState {
    /// Available for allocation.
    Free = 0b00,
    /// Continuation frame of an allocated run.
    Used = 0b01,
    /// First frame of an allocated run.
    HeadOfSequence = 0b10,
    /// Never handed out.
    Inaccessible = 0b11,
}

impl FrameState {
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    /// Decode the low two bits of `value`.
    #[must_use]
    pub const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Free,
            0b01 => Self::Used,
            0b10 => Self::HeadOfSequence,
            _ => Self::Inaccessible,
        }
    }

    /// `true` for states that continue a run started by a head frame.
    #[must_use]
    pub const fn continues_run(self) -> bool {
        matches!(self, Self::Used)
    }
}

/// One bitmap byte: the states of four consecutive frames.
///
/// Frame `4k + i` lives in slot `i`, i.e. at bit offset `2 * i`.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct StateQuad {
    #[bits(2)]
    slot0: FrameState,
    #[bits(2)]
    slot1: FrameState,
    #[bits(2)]
    slot2: FrameState,
    #[bits(2)]
    slot3: FrameState,
}

impl StateQuad {
    pub const FRAMES: usize = 4;

    /// State in `slot` (`0..4`).
    #[must_use]
    pub const fn get(self, slot: usize) -> FrameState {
        match slot {
            0 => self.slot0(),
            1 => self.slot1(),
            2 => self.slot2(),
            _ => self.slot3(),
        }
    }

    pub fn set(&mut self, slot: usize, state: FrameState) {
        match slot {
            0 => self.set_slot0(state),
            1 => self.set_slot1(state),
            2 => self.set_slot2(state),
            _ => self.set_slot3(state),
        }
    }
}
