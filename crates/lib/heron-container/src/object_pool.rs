use std::marker::PhantomData;

use crate::handle::Handle;
use crate::index_alloc::{IndexAllocator, INVALID_INDEX};

/// Generational handle pool splitting each object into hot and cold halves.
///
/// The hot half is the data touched every pass during execution (device
/// handles, views, access masks); the cold half is only touched while
/// building (descriptions, lifetimes, barrier state). Both live in
/// contiguous arrays of the same capacity so a slot index addresses either.
///
/// Every `remove` bumps the slot's generation, so dangling handles from a
/// previous frame are caught on lookup.
pub struct ObjectPool<H: Handle, Hot, Cold> {
    indices: IndexAllocator,
    generations: Vec<u8>,
    hot: Vec<Option<Hot>>,
    cold: Vec<Option<Cold>>,
    _marker: PhantomData<H>,
}

impl<H: Handle, Hot, Cold> ObjectPool<H, Hot, Cold> {
    pub fn new(capacity: u32) -> Self {
        let capacity_usize = capacity as usize;

        let mut hot = Vec::new();
        hot.resize_with(capacity_usize, || None);
        let mut cold = Vec::new();
        cold.resize_with(capacity_usize, || None);

        Self {
            indices: IndexAllocator::new(capacity),
            generations: vec![0; capacity_usize],
            hot,
            cold,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn live_count(&self) -> u32 {
        self.indices.live_count()
    }

    /// Store a new object, returning its handle.
    /// Returns `H::INVALID` when the pool is full; stored data is untouched.
    pub fn store(&mut self, hot: Hot, cold: Cold) -> H {
        let index = self.indices.allocate();
        if index == INVALID_INDEX {
            log::error!("Object pool for salt {:#x} is full!", H::SALT);
            return H::INVALID;
        }

        let slot = index as usize;
        self.hot[slot] = Some(hot);
        self.cold[slot] = Some(cold);

        H::assemble(index, self.generations[slot])
    }

    /// Remove an object and expire every outstanding handle to it.
    pub fn remove(&mut self, handle: H) {
        let slot = self.slot(handle);

        self.hot[slot] = None;
        self.cold[slot] = None;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.indices.free(slot as u32);
    }

    #[inline]
    pub fn get_hot(&self, handle: H) -> &Hot {
        self.hot[self.slot(handle)].as_ref().unwrap()
    }

    #[inline]
    pub fn get_hot_mut(&mut self, handle: H) -> &mut Hot {
        let slot = self.slot(handle);
        self.hot[slot].as_mut().unwrap()
    }

    /// Borrow both halves of one object at once.
    #[inline]
    pub fn get_hot_cold_mut(&mut self, handle: H) -> (&mut Hot, &mut Cold) {
        let slot = self.slot(handle);
        (
            self.hot[slot].as_mut().unwrap(),
            self.cold[slot].as_mut().unwrap(),
        )
    }

    #[inline]
    pub fn get_cold(&self, handle: H) -> &Cold {
        self.cold[self.slot(handle)].as_ref().unwrap()
    }

    #[inline]
    pub fn get_cold_mut(&mut self, handle: H) -> &mut Cold {
        let slot = self.slot(handle);
        self.cold[slot].as_mut().unwrap()
    }

    /// Validate salt and generation and resolve the slot index.
    fn slot(&self, handle: H) -> usize {
        assert!(handle.is_valid(), "Dereferenced an invalid handle: {:?}", handle);

        let index = handle.index() as usize;
        let expected = H::assemble(handle.index(), self.generations[index]);
        assert!(
            handle == expected,
            "Stale handle {:?}, slot is at generation {}!",
            handle,
            self.generations[index]
        );

        index
    }
}
