use crate::error::FrameError;
use crate::frame_state::FrameState;
use crate::pool::FramePool;
use arrayvec::ArrayVec;
use kernel_info::FrameRange;
use kernel_memory_addresses::{FrameNumber, PhysMapper};
use kernel_sync::SpinLock;
use log::{debug, warn};

/// Upper bound on simultaneously registered pools.
pub const MAX_POOLS: usize = 16;

/// Handle of a pool inside a [`FramePoolRegistry`], in registration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PoolId(usize);

impl PoolId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

struct Registered {
    range: FrameRange,
    pool: SpinLock<FramePool>,
}

/// Every live frame pool, so that a bare frame number can be traced back to
/// the pool that handed it out.
///
/// Pools are added during bring-up (`&mut self`) and used afterwards through
/// shared references; each pool has its own lock.
pub struct FramePoolRegistry {
    pools: ArrayVec<Registered, MAX_POOLS>,
}

impl Default for FramePoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePoolRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pools: ArrayVec::new_const(),
        }
    }

    /// Build a pool and register it.
    ///
    /// The range is checked against the registered pools before the pool's
    /// bitmap is written.
    ///
    /// # Errors
    /// [`FrameError::RegistryFull`], [`FrameError::OverlappingPool`], or any
    /// error of [`FramePool::new`].
    ///
    /// # Safety
    /// See [`FramePool::new`].
    pub unsafe fn create_pool<M: PhysMapper>(
        &mut self,
        mapper: &M,
        base: FrameNumber,
        frame_count: u32,
        info_frame: Option<FrameNumber>,
    ) -> Result<PoolId, FrameError> {
        self.check_vacant(FrameRange::new(base.as_u32(), frame_count))?;
        let pool = unsafe { FramePool::new(mapper, base, frame_count, info_frame)? };
        self.register(pool)
    }

    /// Add an already constructed pool.
    ///
    /// # Errors
    /// [`FrameError::RegistryFull`] or [`FrameError::OverlappingPool`].
    pub fn register(&mut self, pool: FramePool) -> Result<PoolId, FrameError> {
        let range = pool.range();
        self.check_vacant(range)?;
        let id = PoolId(self.pools.len());
        self.pools
            .try_push(Registered {
                range,
                pool: SpinLock::new(pool),
            })
            .map_err(|_| FrameError::RegistryFull)?;
        debug!("registered frame pool {id:?} for frames {:#x}..+{}", range.start, range.count);
        Ok(id)
    }

    fn check_vacant(&self, range: FrameRange) -> Result<(), FrameError> {
        if self.pools.is_full() {
            return Err(FrameError::RegistryFull);
        }
        if self.pools.iter().any(|p| p.range.overlaps(&range)) {
            return Err(FrameError::OverlappingPool {
                first: range.first(),
                count: range.count,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Registered pools, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = PoolId> + '_ {
        (0..self.pools.len()).map(PoolId)
    }

    /// The pool whose frame range contains `frame`.
    #[must_use]
    pub fn owner_of(&self, frame: FrameNumber) -> Option<PoolId> {
        let single = FrameRange::new(frame.as_u32(), 1);
        self.pools
            .iter()
            .position(|p| p.range.contains_range(&single))
            .map(PoolId)
    }

    /// Run `f` with exclusive access to pool `id`.
    ///
    /// # Errors
    /// [`FrameError::UnknownPool`] if `id` is not registered here.
    pub fn with_pool<R>(
        &self,
        id: PoolId,
        f: impl FnOnce(&mut FramePool) -> R,
    ) -> Result<R, FrameError> {
        let entry = self.pools.get(id.0).ok_or(FrameError::UnknownPool(id))?;
        Ok(entry.pool.with_lock(f))
    }

    /// [`FramePool::get_frames`] on pool `id`.
    ///
    /// # Errors
    /// [`FrameError::UnknownPool`] or any error of [`FramePool::get_frames`].
    pub fn get_frames(&self, id: PoolId, n: u32) -> Result<FrameNumber, FrameError> {
        self.with_pool(id, |pool| pool.get_frames(n))?
    }

    /// [`FramePool::mark_inaccessible`] on pool `id`.
    ///
    /// # Errors
    /// [`FrameError::UnknownPool`] or [`FrameError::OutOfRange`].
    pub fn mark_inaccessible(
        &self,
        id: PoolId,
        first: FrameNumber,
        n: u32,
    ) -> Result<(), FrameError> {
        self.with_pool(id, |pool| pool.mark_inaccessible(first, n))?
    }

    /// Release the run starting at `first`, whichever pool it came from.
    ///
    /// Returns the number of frames freed.
    ///
    /// # Errors
    /// [`FrameError::UnknownFrame`] if no registered pool contains `first`,
    /// otherwise any error of [`FramePool::release`].
    pub fn release_frames(&self, first: FrameNumber) -> Result<u32, FrameError> {
        let Some(owner) = self.owner_of(first) else {
            warn!("release of frame {first} outside every pool");
            return Err(FrameError::UnknownFrame { frame: first });
        };
        self.with_pool(owner, |pool| pool.release(first))?
            .inspect_err(|e| warn!("release of frame {first} rejected: {e}"))
    }

    /// Free frames left in pool `id`.
    ///
    /// # Errors
    /// [`FrameError::UnknownPool`].
    pub fn free_count(&self, id: PoolId) -> Result<u32, FrameError> {
        self.with_pool(id, |pool| pool.free_count())
    }

    /// State of `frame` in whichever pool owns it.
    #[must_use]
    pub fn state(&self, frame: FrameNumber) -> Option<FrameState> {
        let owner = self.owner_of(frame)?;
        self.with_pool(owner, |pool| pool.state(frame)).ok().flatten()
    }
}
