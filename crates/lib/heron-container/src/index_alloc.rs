/// Returned by [`IndexAllocator::allocate`] when the index range is exhausted.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Dense free-list allocator over a fixed index range `[0, capacity)`.
///
/// Freed indices are handed out again (LIFO) before the high watermark is
/// extended, so the live index set stays as dense as possible.
pub struct IndexAllocator {
    capacity: u32,
    watermark: u32,
    free_list: Vec<u32>,
}

impl IndexAllocator {
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < INVALID_INDEX);

        Self {
            capacity,
            watermark: 0,
            free_list: Vec::new(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of indices currently handed out.
    #[inline]
    pub fn live_count(&self) -> u32 {
        self.watermark - self.free_list.len() as u32
    }

    /// Allocate a free index, or [`INVALID_INDEX`] when the range is exhausted.
    pub fn allocate(&mut self) -> u32 {
        if let Some(index) = self.free_list.pop() {
            return index;
        }

        if self.watermark >= self.capacity {
            log::error!("Index allocator exhausted ({} indices)!", self.capacity);
            return INVALID_INDEX;
        }

        let index = self.watermark;
        self.watermark += 1;
        index
    }

    /// Return an index to the allocator for reuse.
    pub fn free(&mut self, index: u32) {
        assert!(index < self.watermark, "Freed index {} was never allocated!", index);
        debug_assert!(!self.free_list.contains(&index), "Double free of index {}!", index);

        self.free_list.push(index);
    }
}
