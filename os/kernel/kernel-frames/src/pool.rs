//! A contiguous frame pool backed by a one-frame state bitmap.

use crate::bitmap::{FRAMES_PER_INFO_FRAME, FrameBitmap};
use crate::error::FrameError;
use crate::frame_state::FrameState;
use core::fmt;
use core::ptr::NonNull;
use kernel_info::FrameRange;
use kernel_memory_addresses::{FrameNumber, PhysMapper};
use log::{debug, trace};

/// Frame allocator for the range `[base, base + frame_count)`.
///
/// Allocations are runs of contiguous frames. The first frame of a run is
/// marked [`FrameState::HeadOfSequence`], the rest [`FrameState::Used`]; the
/// length is never stored and is recovered on release by scanning to the
/// next boundary.
pub struct FramePool {
    base: FrameNumber,
    frame_count: u32,
    free_count: u32,
    info_frame: FrameNumber,
    self_donated: bool,
    bitmap: NonNull<FrameBitmap>,
}

// Safety: the bitmap frame is owned by exactly one pool.
unsafe impl Send for FramePool {}

impl FramePool {
    /// Largest pool a single info frame can describe.
    pub const MAX_FRAMES: u32 = FRAMES_PER_INFO_FRAME;

    /// Build a pool over `frame_count` frames starting at `base`.
    ///
    /// With `info_frame == None` the pool keeps its bitmap in its own first
    /// frame, which is marked [`FrameState::Used`] and never handed out.
    /// Otherwise the bitmap lives in the given frame, which must come from
    /// elsewhere. Every other frame starts [`FrameState::Free`].
    ///
    /// # Errors
    /// [`FrameError::EmptyPool`], [`FrameError::PoolTooLarge`],
    /// [`FrameError::PoolWraps`] or [`FrameError::InfoFrameInsidePool`].
    ///
    /// # Safety
    /// The info frame must be reserved for this pool for as long as the pool
    /// lives, and `mapper` must keep returning the same mapping for it.
    pub unsafe fn new<M: PhysMapper>(
        mapper: &M,
        base: FrameNumber,
        frame_count: u32,
        info_frame: Option<FrameNumber>,
    ) -> Result<Self, FrameError> {
        if frame_count == 0 {
            return Err(FrameError::EmptyPool);
        }
        if frame_count > Self::MAX_FRAMES {
            return Err(FrameError::PoolTooLarge {
                count: frame_count,
                max: Self::MAX_FRAMES,
            });
        }
        if base.checked_add(frame_count).is_none() {
            return Err(FrameError::PoolWraps {
                base,
                count: frame_count,
            });
        }

        let range = FrameRange::new(base.as_u32(), frame_count);
        let (info, self_donated) = match info_frame {
            None => (base, true),
            Some(info) if range.overlaps(&FrameRange::new(info.as_u32(), 1)) => {
                return Err(FrameError::InfoFrameInsidePool { info });
            }
            Some(info) => (info, false),
        };

        let bitmap: &mut FrameBitmap = unsafe { mapper.frame_to_mut(info) };
        bitmap.reset();

        let mut free_count = frame_count;
        if self_donated {
            bitmap.set(0, FrameState::Used);
            free_count -= 1;
        }

        debug!(
            "frame pool {base}..+{frame_count}: bitmap in {info}{}",
            if self_donated { " (self-donated)" } else { "" }
        );

        Ok(Self {
            base,
            frame_count,
            free_count,
            info_frame: info,
            self_donated,
            bitmap: NonNull::from(bitmap),
        })
    }

    /// Info frames needed to describe `frame_count` frames.
    ///
    /// ```rust
    /// # use kernel_frames::FramePool;
    /// assert_eq!(FramePool::needed_info_frames(1), 1);
    /// assert_eq!(FramePool::needed_info_frames(16384), 1);
    /// assert_eq!(FramePool::needed_info_frames(16385), 2);
    /// ```
    #[must_use]
    pub const fn needed_info_frames(frame_count: u32) -> u32 {
        frame_count.div_ceil(FRAMES_PER_INFO_FRAME)
    }

    #[must_use]
    pub const fn base_frame(&self) -> FrameNumber {
        self.base
    }

    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    #[must_use]
    pub const fn free_count(&self) -> u32 {
        self.free_count
    }

    #[must_use]
    pub const fn info_frame(&self) -> FrameNumber {
        self.info_frame
    }

    #[must_use]
    pub const fn is_self_donated(&self) -> bool {
        self.self_donated
    }

    #[must_use]
    pub const fn range(&self) -> FrameRange {
        FrameRange::new(self.base.as_u32(), self.frame_count)
    }

    #[must_use]
    pub fn contains(&self, frame: FrameNumber) -> bool {
        self.offset_of(frame).is_some()
    }

    /// State of `frame`, or `None` if it is not part of this pool.
    #[must_use]
    pub fn state(&self, frame: FrameNumber) -> Option<FrameState> {
        self.offset_of(frame).map(|i| self.bitmap().get(i))
    }

    /// Allocate `n` contiguous frames, lowest address first.
    ///
    /// # Errors
    /// - [`FrameError::ZeroFrames`] if `n == 0`.
    /// - [`FrameError::InsufficientFrames`] if fewer than `n` frames are free.
    /// - [`FrameError::NoContiguousRun`] if the free frames are too fragmented.
    pub fn get_frames(&mut self, n: u32) -> Result<FrameNumber, FrameError> {
        if n == 0 {
            return Err(FrameError::ZeroFrames);
        }
        if n > self.free_count {
            return Err(FrameError::InsufficientFrames {
                requested: n,
                free: self.free_count,
            });
        }

        let start = self
            .find_free_run(n)
            .ok_or(FrameError::NoContiguousRun { requested: n })?;

        let bitmap = self.bitmap_mut();
        bitmap.set(start, FrameState::HeadOfSequence);
        for i in start + 1..start + n {
            bitmap.set(i, FrameState::Used);
        }
        self.free_count -= n;

        let first = self.base + start;
        trace!("allocated {n} frame(s) at {first}, {} free", self.free_count);
        Ok(first)
    }

    /// Mark `[first, first + n)` as [`FrameState::Inaccessible`].
    ///
    /// Frames that were free stop counting as free.
    ///
    /// # Errors
    /// [`FrameError::OutOfRange`] if any frame of the range is not in this
    /// pool. Nothing is marked in that case.
    pub fn mark_inaccessible(&mut self, first: FrameNumber, n: u32) -> Result<(), FrameError> {
        let out_of_range = FrameError::OutOfRange { first, count: n };
        let start = self.offset_of(first).ok_or(out_of_range)?;
        let end = start.checked_add(n).ok_or(out_of_range)?;
        if end > self.frame_count {
            return Err(out_of_range);
        }

        let bitmap = self.bitmap_mut();
        let mut newly_unavailable = 0;
        for i in start..end {
            if bitmap.get(i) == FrameState::Free {
                newly_unavailable += 1;
            }
            bitmap.set(i, FrameState::Inaccessible);
        }
        self.free_count -= newly_unavailable;

        debug!("marked {n} frame(s) at {first} inaccessible");
        Ok(())
    }

    /// Free the run that starts at `first`; returns the number of frames freed.
    ///
    /// The run extends up to the next free frame, the next head frame, or the
    /// end of the pool. The whole run is checked before anything is changed.
    ///
    /// # Errors
    /// - [`FrameError::UnknownFrame`] if `first` is not in this pool.
    /// - [`FrameError::NotHeadOfSequence`] if `first` does not start a run.
    /// - [`FrameError::InaccessibleInRun`] if the run runs into an
    ///   inaccessible frame.
    pub fn release(&mut self, first: FrameNumber) -> Result<u32, FrameError> {
        let start = self
            .offset_of(first)
            .ok_or(FrameError::UnknownFrame { frame: first })?;

        let bitmap = self.bitmap();
        let state = bitmap.get(start);
        if state != FrameState::HeadOfSequence {
            return Err(FrameError::NotHeadOfSequence {
                frame: first,
                state,
            });
        }

        let mut end = start + 1;
        while end < self.frame_count {
            match bitmap.get(end) {
                FrameState::Used => end += 1,
                FrameState::Free | FrameState::HeadOfSequence => break,
                FrameState::Inaccessible => {
                    return Err(FrameError::InaccessibleInRun {
                        frame: self.base + end,
                    });
                }
            }
        }

        let bitmap = self.bitmap_mut();
        for i in start..end {
            bitmap.set(i, FrameState::Free);
        }
        let freed = end - start;
        self.free_count += freed;

        trace!("released {freed} frame(s) at {first}, {} free", self.free_count);
        Ok(freed)
    }

    /// First-fit search for `n` consecutive free frames.
    fn find_free_run(&self, n: u32) -> Option<u32> {
        let bitmap = self.bitmap();
        let mut run_start = 0;
        let mut run_len = 0;
        for i in 0..self.frame_count {
            if bitmap.get(i) != FrameState::Free {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len == n {
                return Some(run_start);
            }
        }
        None
    }

    fn offset_of(&self, frame: FrameNumber) -> Option<u32> {
        frame
            .offset_from(self.base)
            .filter(|&offset| offset < self.frame_count)
    }

    #[inline]
    const fn bitmap(&self) -> &FrameBitmap {
        unsafe { self.bitmap.as_ref() }
    }

    #[inline]
    const fn bitmap_mut(&mut self) -> &mut FrameBitmap {
        unsafe { self.bitmap.as_mut() }
    }
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("base", &self.base)
            .field("frame_count", &self.frame_count)
            .field("free_count", &self.free_count)
            .field("info_frame", &self.info_frame)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::sim::SimulatedRam;

    const BASE: FrameNumber = FrameNumber::new(0x200);

    fn ram() -> SimulatedRam {
        // Untouched bytes read as "all inaccessible" so a missing reset shows.
        SimulatedRam::with_fill(FrameNumber::new(0x100), 0x800, 0xFF)
    }

    fn pool(ram: &SimulatedRam, count: u32) -> FramePool {
        unsafe { FramePool::new(ram, BASE, count, None) }.unwrap()
    }

    #[test]
    fn self_donated_pool_charges_its_bitmap_frame() {
        let ram = ram();
        let pool = pool(&ram, 64);
        assert_eq!(pool.free_count(), 63);
        assert_eq!(pool.info_frame(), BASE);
        assert_eq!(pool.state(BASE), Some(FrameState::Used));
        for i in 1..64 {
            assert_eq!(pool.state(BASE + i), Some(FrameState::Free));
        }
        assert_eq!(pool.state(BASE + 64), None);
    }

    #[test]
    fn external_info_frame_is_not_charged() {
        let ram = ram();
        let info = FrameNumber::new(0x100);
        let pool = unsafe { FramePool::new(&ram, BASE, 64, Some(info)) }.unwrap();
        assert_eq!(pool.free_count(), 64);
        assert!(!pool.is_self_donated());
        assert_eq!(pool.state(BASE), Some(FrameState::Free));
    }

    #[test]
    fn construction_rejects_bad_geometry() {
        let ram = ram();
        let err = unsafe { FramePool::new(&ram, BASE, 0, None) }.unwrap_err();
        assert_eq!(err, FrameError::EmptyPool);

        let err = unsafe { FramePool::new(&ram, BASE, 16385, None) }.unwrap_err();
        assert_eq!(
            err,
            FrameError::PoolTooLarge {
                count: 16385,
                max: 16384
            }
        );

        let info = BASE + 3;
        let err = unsafe { FramePool::new(&ram, BASE, 64, Some(info)) }.unwrap_err();
        assert_eq!(err, FrameError::InfoFrameInsidePool { info });
    }

    #[test]
    fn get_frames_marks_head_and_continuation() {
        let ram = ram();
        let mut pool = pool(&ram, 64);
        let first = pool.get_frames(4).unwrap();
        assert_eq!(first, BASE + 1);
        assert_eq!(pool.state(first), Some(FrameState::HeadOfSequence));
        for i in 1..4 {
            assert_eq!(pool.state(first + i), Some(FrameState::Used));
        }
        assert_eq!(pool.state(first + 4), Some(FrameState::Free));
        assert_eq!(pool.free_count(), 59);
    }

    #[test]
    fn adjacent_runs_stay_separate() {
        let ram = ram();
        let mut pool = pool(&ram, 64);
        let a = pool.get_frames(2).unwrap();
        let b = pool.get_frames(3).unwrap();
        assert_eq!(b, a + 2);

        assert_eq!(pool.release(a), Ok(2));
        assert_eq!(pool.state(b), Some(FrameState::HeadOfSequence));
        assert_eq!(pool.release(b), Ok(3));
        assert_eq!(pool.free_count(), 63);
    }

    #[test]
    fn run_at_end_of_pool_is_released_completely() {
        let ram = ram();
        let mut pool = pool(&ram, 8);
        let run = pool.get_frames(7).unwrap();
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.release(run), Ok(7));
        assert_eq!(pool.free_count(), 7);
    }

    #[test]
    fn allocation_skips_inaccessible_frames() {
        let ram = ram();
        let mut pool = pool(&ram, 16);
        pool.mark_inaccessible(BASE + 3, 2).unwrap();
        assert_eq!(pool.free_count(), 13);

        // Frames 1..3 are too short for a run of three.
        let run = pool.get_frames(3).unwrap();
        assert_eq!(run, BASE + 5);
        let short = pool.get_frames(2).unwrap();
        assert_eq!(short, BASE + 1);
    }

    #[test]
    fn fragmentation_is_exhaustion() {
        let ram = ram();
        let mut pool = pool(&ram, 8);
        let a = pool.get_frames(1).unwrap();
        let _b = pool.get_frames(1).unwrap();
        pool.release(a).unwrap();

        // Six frames are free (1 and 3..8), but never six in a row.
        assert_eq!(pool.free_count(), 6);
        let err = pool.get_frames(6).unwrap_err();
        assert_eq!(err, FrameError::NoContiguousRun { requested: 6 });
        assert_eq!(err.class(), crate::ErrorClass::Exhaustion);
    }

    #[test]
    fn zero_frames_is_a_violation() {
        let ram = ram();
        let mut pool = pool(&ram, 8);
        let err = pool.get_frames(0).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::ProtocolViolation);
    }

    #[test]
    fn release_of_non_head_leaves_state_untouched() {
        let ram = ram();
        let mut pool = pool(&ram, 16);
        let run = pool.get_frames(3).unwrap();

        let err = pool.release(run + 1).unwrap_err();
        assert_eq!(
            err,
            FrameError::NotHeadOfSequence {
                frame: run + 1,
                state: FrameState::Used
            }
        );
        let err = pool.release(run + 5).unwrap_err();
        assert!(matches!(
            err,
            FrameError::NotHeadOfSequence {
                state: FrameState::Free,
                ..
            }
        ));
        assert_eq!(pool.free_count(), 12);
        assert_eq!(pool.state(run), Some(FrameState::HeadOfSequence));
    }

    #[test]
    fn inaccessible_frame_inside_run_blocks_release() {
        let ram = ram();
        let mut pool = pool(&ram, 16);
        let run = pool.get_frames(4).unwrap();
        pool.mark_inaccessible(run + 2, 1).unwrap();

        let err = pool.release(run).unwrap_err();
        assert_eq!(err, FrameError::InaccessibleInRun { frame: run + 2 });
        assert_eq!(pool.state(run), Some(FrameState::HeadOfSequence));
        assert_eq!(pool.state(run + 1), Some(FrameState::Used));
    }

    #[test]
    fn mark_inaccessible_checks_bounds_first() {
        let ram = ram();
        let mut pool = pool(&ram, 16);
        let err = pool.mark_inaccessible(BASE + 14, 3).unwrap_err();
        assert_eq!(
            err,
            FrameError::OutOfRange {
                first: BASE + 14,
                count: 3
            }
        );
        assert_eq!(pool.state(BASE + 14), Some(FrameState::Free));
        assert!(pool.mark_inaccessible(FrameNumber::new(0x1FF), 1).is_err());
        assert_eq!(pool.free_count(), 15);
    }

    #[test]
    fn round_trip_returns_same_frame() {
        let ram = ram();
        let mut pool = pool(&ram, 128);
        let _keep = pool.get_frames(5).unwrap();
        let first = pool.get_frames(17).unwrap();
        pool.release(first).unwrap();
        assert_eq!(pool.get_frames(17), Ok(first));
    }

    #[test]
    fn needed_info_frames_is_monotonic() {
        let mut previous = 0;
        for n in (0..100_000).step_by(997) {
            let k = FramePool::needed_info_frames(n);
            assert!(k >= previous);
            previous = k;
        }
        assert_eq!(FramePool::needed_info_frames(0), 0);
        assert_eq!(FramePool::needed_info_frames(16384), 1);
        assert_eq!(FramePool::needed_info_frames(16385), 2);
    }
}
