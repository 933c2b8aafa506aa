use heron_container::BumpAllocator;

#[test]
pub fn test_aligned_allocations() {
    let arena = BumpAllocator::new(1024);

    let a = arena.allocate(3, 1);
    let b = arena.allocate(8, 8);
    let c = arena.allocate(1, 16);

    assert_eq!(0, a.as_ptr() as usize % 1);
    assert_eq!(0, b.as_ptr() as usize % 8);
    assert_eq!(0, c.as_ptr() as usize % 16);

    // Cursor advanced past every allocation including padding.
    assert!(arena.used() >= 3 + 8 + 1);
}

#[test]
pub fn test_value_and_slice_copies() {
    let arena = BumpAllocator::new(1024);

    let value = arena.alloc_value(42u64);
    assert_eq!(42, unsafe { *value.as_ref() });

    let source = [1u32, 2, 3, 4];
    let slice = arena.alloc_slice_copy(&source);
    assert_eq!(&source[..], unsafe { slice.as_slice() });

    let empty: [u32; 0] = [];
    assert!(arena.alloc_slice_copy(&empty).is_empty());
}

#[test]
pub fn test_reset_equals_fresh_arena() {
    let mut arena = BumpAllocator::new(256);

    arena.allocate(256, 1);
    assert_eq!(256, arena.used());

    arena.reset();
    assert_eq!(0, arena.used());

    // The full capacity is available again.
    arena.allocate(256, 1);
    assert_eq!(256, arena.used());
}

#[test]
#[should_panic]
pub fn test_out_of_space_is_fatal() {
    let arena = BumpAllocator::new(64);
    arena.allocate(65, 1);
}
