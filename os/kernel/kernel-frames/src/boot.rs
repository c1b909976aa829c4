//! Boot-time construction of the kernel and process pools.

use crate::error::FrameError;
use crate::pool::FramePool;
use crate::registry::{FramePoolRegistry, PoolId};
use kernel_info::MemoryLayout;
use kernel_memory_addresses::PhysMapper;
use log::info;

/// The two pools every machine has.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BootPools {
    /// Page directories, page tables and allocator metadata.
    pub kernel: PoolId,
    /// Demand-paged data frames.
    pub process: PoolId,
}

/// Create the kernel and process pools described by `layout`.
///
/// The kernel pool keeps its own bitmap. The process pool's bitmap is
/// allocated from the kernel pool, and the memory hole, if any, is marked
/// inaccessible in the process pool.
///
/// # Errors
/// [`FrameError::InvalidLayout`] for a malformed layout, otherwise whatever
/// pool construction or allocation reports.
///
/// # Safety
/// Every frame of both pools must be unused RAM reachable through `mapper`
/// for as long as `registry` lives.
pub unsafe fn bring_up<M: PhysMapper>(
    registry: &mut FramePoolRegistry,
    mapper: &M,
    layout: &MemoryLayout,
) -> Result<BootPools, FrameError> {
    layout.validate()?;

    let kernel_range = layout.kernel_pool;
    let kernel = unsafe { registry.create_pool(mapper, kernel_range.first(), kernel_range.count, None)? };

    let process_range = layout.process_pool;
    let info_frames = FramePool::needed_info_frames(process_range.count);
    let info = registry.get_frames(kernel, info_frames)?;
    let process = unsafe {
        registry.create_pool(mapper, process_range.first(), process_range.count, Some(info))?
    };

    if let Some(hole) = layout.memory_hole {
        registry.mark_inaccessible(process, hole.first(), hole.count)?;
    }

    info!(
        "frame pools up: kernel {} free, process {} free",
        registry.free_count(kernel)?,
        registry.free_count(process)?
    );
    Ok(BootPools { kernel, process })
}
