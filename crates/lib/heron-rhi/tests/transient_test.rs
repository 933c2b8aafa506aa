use std::sync::Arc;

use heron_rhi::null::NullDevice;
use heron_rhi::{TransientMemoryAllocator, TRANSIENT_PAGE_SIZE};

const PAGES_PER_BACKING: u32 = 16;

fn make_allocator() -> (NullDevice, TransientMemoryAllocator) {
    let device = NullDevice::new();
    let allocator =
        TransientMemoryAllocator::new(Arc::new(device.clone()), PAGES_PER_BACKING);
    (device, allocator)
}

#[test]
pub fn test_allocations_do_not_overlap() {
    let (_device, mut allocator) = make_allocator();

    let regions = (0..4)
        .map(|_| allocator.allocate_memory_region(3 * TRANSIENT_PAGE_SIZE))
        .collect::<Vec<_>>();

    for (i, a) in regions.iter().enumerate() {
        for b in regions.iter().skip(i + 1) {
            if a.allocation == b.allocation {
                let a_end = a.offset_in_allocation + a.region_size;
                let b_end = b.offset_in_allocation + b.region_size;
                assert!(
                    a_end <= b.offset_in_allocation || b_end <= a.offset_in_allocation,
                    "Regions {:?} and {:?} overlap!",
                    a,
                    b
                );
            }
        }
    }
}

#[test]
pub fn test_size_rounds_up_to_whole_pages() {
    let (_device, mut allocator) = make_allocator();

    let region = allocator.allocate_memory_region(TRANSIENT_PAGE_SIZE + 1);
    assert_eq!(2 * TRANSIENT_PAGE_SIZE, region.region_size);

    let region = allocator.allocate_memory_region(1);
    assert_eq!(TRANSIENT_PAGE_SIZE, region.region_size);
}

#[test]
pub fn test_free_accounting_adds_up() {
    let (_device, mut allocator) = make_allocator();

    let a = allocator.allocate_memory_region(4 * TRANSIENT_PAGE_SIZE);
    let b = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);
    let c = allocator.allocate_memory_region(5 * TRANSIENT_PAGE_SIZE);

    allocator.free_memory_region(&b);

    // free + used always equals the page count of the backing
    assert_eq!(
        PAGES_PER_BACKING,
        allocator.free_pages_in_backing(0) + allocator.used_pages_in_backing(0)
    );
    assert_eq!(4 + 5, allocator.used_pages_in_backing(0));

    allocator.free_memory_region(&a);
    allocator.free_memory_region(&c);

    assert_eq!(PAGES_PER_BACKING, allocator.free_pages_in_backing(0));
    assert_eq!(0, allocator.used_pages_in_backing(0));
}

#[test]
pub fn test_freed_pages_are_reused() {
    let (_device, mut allocator) = make_allocator();

    let a = allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE);
    allocator.free_memory_region(&a);

    // The whole backing coalesced back into a single free range, a
    // full-backing allocation must fit again without a new backing.
    let b = allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE);
    assert_eq!(1, allocator.backing_count());
    assert_eq!(a, b);
}

#[test]
pub fn test_full_backing_fits_exactly() {
    let (_device, mut allocator) = make_allocator();

    let region =
        allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE);

    assert_eq!(1, allocator.backing_count());
    assert_eq!(0, region.offset_in_allocation);
    assert_eq!(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE, region.region_size);
}

#[test]
pub fn test_overflow_grows_a_new_backing() {
    let (_device, mut allocator) = make_allocator();

    let a = allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE);
    let b = allocator.allocate_memory_region(1);

    assert_eq!(2, allocator.backing_count());
    assert_ne!(a.allocation, b.allocation);
}

#[test]
#[should_panic]
pub fn test_request_larger_than_a_backing_is_rejected() {
    let (_device, mut allocator) = make_allocator();
    allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE + 1);
}

#[test]
pub fn test_free_coalesces_across_both_neighbors() {
    let (_device, mut allocator) = make_allocator();

    let a = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);
    let b = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);
    let c = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);

    // Free the two sides first, then the middle; everything must merge back
    // together with the trailing free range.
    allocator.free_memory_region(&a);
    allocator.free_memory_region(&c);
    allocator.free_memory_region(&b);

    assert_eq!(PAGES_PER_BACKING, allocator.free_pages_in_backing(0));

    let big = allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE);
    assert_eq!(0, big.offset_in_allocation);
    assert_eq!(1, allocator.backing_count());
}

#[test]
pub fn test_free_splits_enclosing_used_range() {
    let (_device, mut allocator) = make_allocator();

    // Three adjacent allocations coalesce into one used range internally.
    let a = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);
    let b = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);
    let c = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);

    // Free the middle region; the used range must split around the hole.
    allocator.free_memory_region(&b);
    assert_eq!(4, allocator.used_pages_in_backing(0));

    // The hole is reusable.
    let d = allocator.allocate_memory_region(2 * TRANSIENT_PAGE_SIZE);
    assert_eq!(b.offset_in_allocation, d.offset_in_allocation);

    allocator.free_memory_region(&a);
    allocator.free_memory_region(&c);
    allocator.free_memory_region(&d);
    assert_eq!(PAGES_PER_BACKING, allocator.free_pages_in_backing(0));
}

#[test]
pub fn test_backings_are_released_on_drop() {
    let device = NullDevice::new();

    {
        let mut allocator =
            TransientMemoryAllocator::new(Arc::new(device.clone()), PAGES_PER_BACKING);
        allocator.allocate_memory_region(PAGES_PER_BACKING as u64 * TRANSIENT_PAGE_SIZE);
        allocator.allocate_memory_region(1);
    }

    let allocs = device.call_count(|c| matches!(c, heron_rhi::null::DeviceCall::GpuAlloc { .. }));
    let frees = device.call_count(|c| matches!(c, heron_rhi::null::DeviceCall::GpuFree { .. }));
    assert_eq!(2, allocs);
    assert_eq!(allocs, frees);
}
