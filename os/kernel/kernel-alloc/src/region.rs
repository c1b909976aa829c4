use arrayvec::ArrayVec;
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress};

/// Slots in a pool's region table, including the header slot.
pub const MAX_REGIONS: usize = 512;

/// A page-granular range handed out by a region pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Region {
    pub start: VirtualAddress,
    pub size: u32,
}

impl Region {
    #[must_use]
    pub const fn new(start: VirtualAddress, size: u32) -> Self {
        Self { start, size }
    }

    /// First address past the region.
    #[must_use]
    pub fn end(&self) -> VirtualAddress {
        self.start + self.size
    }

    /// `start <= address <= start + size`.
    ///
    /// The upper bound is inclusive, so the first byte after the region is
    /// accepted as well.
    #[must_use]
    pub fn covers(&self, address: VirtualAddress) -> bool {
        let start = u64::from(self.start.as_u32());
        (start..=start + u64::from(self.size)).contains(&u64::from(address.as_u32()))
    }

    /// Base address of every page in the region.
    pub fn pages(&self) -> impl Iterator<Item = VirtualAddress> + use<> {
        let start = self.start;
        (0..self.size)
            .step_by(PAGE_SIZE as usize)
            .map(move |offset| start + offset)
    }
}

/// Densely packed regions, oldest first.
///
/// Slot 0 describes the pool's own header page and never goes away; every
/// allocation is appended directly after the last slot.
pub struct RegionTable {
    slots: ArrayVec<Region, MAX_REGIONS>,
}

impl RegionTable {
    #[must_use]
    pub fn new(header: Region) -> Self {
        let mut slots = ArrayVec::new();
        slots.push(header);
        Self { slots }
    }

    /// Occupied slots, the header included.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// The most recently appended region (the header if nothing is allocated).
    #[must_use]
    pub fn last(&self) -> &Region {
        // Slot 0 is never removed.
        &self.slots[self.slots.len() - 1]
    }

    /// Append `region`.
    ///
    /// # Errors
    /// Hands `region` back if every slot is taken.
    pub fn push(&mut self, region: Region) -> Result<(), Region> {
        self.slots.try_push(region).map_err(|e| e.element())
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Region> {
        self.slots.get(index)
    }

    /// Slot of the allocated region starting exactly at `start`.
    #[must_use]
    pub fn position(&self, start: VirtualAddress) -> Option<usize> {
        self.slots
            .iter()
            .skip(1)
            .position(|r| r.start == start)
            .map(|i| i + 1)
    }

    /// Drop slot `index`, shifting the following slots down by one.
    ///
    /// # Panics
    /// If `index` is 0 or out of bounds.
    pub fn remove(&mut self, index: usize) -> Region {
        assert!(index != 0, "the header slot is permanent");
        self.slots.remove(index)
    }

    /// Every slot, the header first.
    pub fn iter(&self) -> impl Iterator<Item = &Region> + '_ {
        self.slots.iter()
    }

    /// Allocated regions only.
    pub fn allocated(&self) -> impl Iterator<Item = &Region> + '_ {
        self.slots.iter().skip(1)
    }
}
