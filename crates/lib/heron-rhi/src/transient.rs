use std::sync::Arc;

use crate::device::Device;
use crate::handles::GpuAllocation;
use crate::resource::{GpuAllocationFlags, GpuMemoryRegion};

use heron_container::Handle;

pub const TRANSIENT_PAGE_SIZE: u64 = 64 * 1024;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct PageRange {
    start_page: u32,
    page_count: u32,
}

struct BackingAllocation {
    allocation: GpuAllocation,
    page_count: u32,

    /// Both lists stay sorted by start page so neighbors can coalesce.
    free_ranges: Vec<PageRange>,
    used_ranges: Vec<PageRange>,
}

/// Page suballocator over device-only backing heaps.
///
/// Regions are handed out in whole 64 KiB pages, first-fit over the existing
/// backings. When no backing can serve a request, a new one is allocated from
/// the device. A single region never spans two backings, so requests larger
/// than one backing are rejected.
pub struct TransientMemoryAllocator {
    device: Arc<dyn Device>,
    pages_per_backing: u32,
    backings: Vec<BackingAllocation>,
}

impl TransientMemoryAllocator {
    pub fn new(device: Arc<dyn Device>, pages_per_backing: u32) -> Self {
        assert!(pages_per_backing > 0);

        let mut allocator = Self {
            device,
            pages_per_backing,
            backings: Vec::new(),
        };
        allocator.new_backing_allocation();
        allocator
    }

    #[inline]
    pub fn pages_per_backing(&self) -> u32 {
        self.pages_per_backing
    }

    #[inline]
    pub fn backing_count(&self) -> usize {
        self.backings.len()
    }

    /// Total free pages in one backing, for accounting checks.
    pub fn free_pages_in_backing(&self, backing_idx: usize) -> u32 {
        self.backings[backing_idx]
            .free_ranges
            .iter()
            .map(|r| r.page_count)
            .sum()
    }

    /// Total used pages in one backing, for accounting checks.
    pub fn used_pages_in_backing(&self, backing_idx: usize) -> u32 {
        self.backings[backing_idx]
            .used_ranges
            .iter()
            .map(|r| r.page_count)
            .sum()
    }

    pub fn allocate_memory_region(&mut self, size_in_bytes: u64) -> GpuMemoryRegion {
        assert!(size_in_bytes > 0);
        assert!(
            size_in_bytes <= self.pages_per_backing as u64 * TRANSIENT_PAGE_SIZE,
            "Transient allocation of {} bytes exceeds one backing ({} pages)!",
            size_in_bytes,
            self.pages_per_backing
        );

        let page_count =
            ((size_in_bytes + TRANSIENT_PAGE_SIZE - 1) / TRANSIENT_PAGE_SIZE) as u32;

        for backing in &mut self.backings {
            if let Some(region) = Self::try_allocate_page_range(backing, page_count) {
                return region;
            }
        }

        self.new_backing_allocation();
        Self::try_allocate_page_range(self.backings.last_mut().unwrap(), page_count)
            .expect("A fresh transient backing must serve any in-bounds request!")
    }

    pub fn free_memory_region(&mut self, region: &GpuMemoryRegion) {
        assert!(region.allocation.is_valid());

        let backing = self
            .backings
            .iter_mut()
            .find(|b| b.allocation == region.allocation)
            .expect("Freed region does not belong to this transient allocator!");

        Self::free_page_range(
            backing,
            PageRange {
                start_page: (region.offset_in_allocation / TRANSIENT_PAGE_SIZE) as u32,
                page_count: (region.region_size / TRANSIENT_PAGE_SIZE) as u32,
            },
        );
    }

    fn new_backing_allocation(&mut self) {
        log::debug!(
            "Transient allocator grows a new backing of {} pages",
            self.pages_per_backing
        );

        let allocation = self.device.gpu_alloc(
            self.pages_per_backing as u64 * TRANSIENT_PAGE_SIZE,
            GpuAllocationFlags::DEVICE_ONLY,
        );

        self.backings.push(BackingAllocation {
            allocation,
            page_count: self.pages_per_backing,
            free_ranges: vec![PageRange {
                start_page: 0,
                page_count: self.pages_per_backing,
            }],
            used_ranges: Vec::new(),
        });
    }

    fn try_allocate_page_range(
        backing: &mut BackingAllocation,
        page_count: u32,
    ) -> Option<GpuMemoryRegion> {
        let candidate = backing
            .free_ranges
            .iter()
            .position(|range| range.page_count >= page_count)?;

        let range = &mut backing.free_ranges[candidate];
        let start_page = range.start_page;

        range.start_page += page_count;
        range.page_count -= page_count;
        if range.page_count == 0 {
            backing.free_ranges.remove(candidate);
        }

        Self::insert_page_range(
            &mut backing.used_ranges,
            PageRange {
                start_page,
                page_count,
            },
        );

        Some(GpuMemoryRegion {
            allocation: backing.allocation,
            offset_in_allocation: start_page as u64 * TRANSIENT_PAGE_SIZE,
            region_size: page_count as u64 * TRANSIENT_PAGE_SIZE,
        })
    }

    fn free_page_range(backing: &mut BackingAllocation, range: PageRange) {
        assert!(range.page_count > 0);
        assert!(range.start_page < backing.page_count);
        assert!(range.start_page + range.page_count <= backing.page_count);

        let start_page = range.start_page;
        let end_page = start_page + range.page_count;

        // Find the used range the freed range falls into and chop it up.
        let enclosing = backing
            .used_ranges
            .iter()
            .position(|used| {
                start_page >= used.start_page
                    && end_page <= used.start_page + used.page_count
            })
            .expect("Freed page range is not inside any used range!");

        let used = backing.used_ranges[enclosing];
        let head = PageRange {
            start_page: used.start_page,
            page_count: start_page - used.start_page,
        };
        let tail = PageRange {
            start_page: end_page,
            page_count: (used.start_page + used.page_count) - end_page,
        };

        if head.page_count == 0 && tail.page_count == 0 {
            backing.used_ranges.remove(enclosing);
        } else if head.page_count == 0 {
            backing.used_ranges[enclosing] = tail;
        } else if tail.page_count == 0 {
            backing.used_ranges[enclosing] = head;
        } else {
            backing.used_ranges[enclosing] = head;
            backing.used_ranges.insert(enclosing + 1, tail);
        }

        Self::insert_page_range(&mut backing.free_ranges, range);
    }

    /// Sorted insert with coalescing against both adjacent neighbors.
    fn insert_page_range(range_list: &mut Vec<PageRange>, new_range: PageRange) {
        let pos = range_list.partition_point(|r| r.start_page < new_range.start_page);

        let merges_prev = pos > 0
            && range_list[pos - 1].start_page + range_list[pos - 1].page_count
                == new_range.start_page;
        let merges_next = pos < range_list.len()
            && new_range.start_page + new_range.page_count == range_list[pos].start_page;

        match (merges_prev, merges_next) {
            (true, true) => {
                // Sat right in between two listed ranges, merge all three.
                range_list[pos - 1].page_count +=
                    new_range.page_count + range_list[pos].page_count;
                range_list.remove(pos);
            }
            (true, false) => {
                range_list[pos - 1].page_count += new_range.page_count;
            }
            (false, true) => {
                range_list[pos].start_page = new_range.start_page;
                range_list[pos].page_count += new_range.page_count;
            }
            (false, false) => {
                range_list.insert(pos, new_range);
            }
        }
    }
}

impl Drop for TransientMemoryAllocator {
    fn drop(&mut self) {
        for backing in self.backings.drain(..) {
            self.device.gpu_free(backing.allocation);
        }
    }
}
