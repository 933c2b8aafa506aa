use heron_rhi::null::{DeviceCall, NullDevice};
use heron_rhi::{BufferCreationFlags, TemporaryBufferAllocator, MAX_FRAME_LATENCY};

#[test]
pub fn test_ring_entries_are_created_up_front() {
    let device = NullDevice::new();
    let allocator = TemporaryBufferAllocator::new(
        &device,
        4096,
        BufferCreationFlags::ALLOW_UNIFORM_BUFFER,
        "test temp ring",
    );

    let buffer_creates =
        device.call_count(|c| matches!(c, DeviceCall::CreateBuffer { .. }));
    assert_eq!(MAX_FRAME_LATENCY, buffer_creates);

    allocator.destroy(&device);
    let buffer_destroys =
        device.call_count(|c| matches!(c, DeviceCall::DestroyBuffer(_)));
    assert_eq!(MAX_FRAME_LATENCY, buffer_destroys);
}

#[test]
pub fn test_allocations_are_aligned_and_disjoint() {
    let device = NullDevice::new();
    let mut allocator = TemporaryBufferAllocator::new(
        &device,
        4096,
        BufferCreationFlags::ALLOW_SHADER_READ_ONLY,
        "test temp ring",
    );

    let a = allocator.allocate_temporary_resource(10, 16);
    let b = allocator.allocate_temporary_resource(100, 256);

    assert_eq!(0, a.offset_in_bytes % 16);
    assert_eq!(0, b.offset_in_bytes % 256);
    assert!(b.offset_in_bytes >= a.offset_in_bytes + a.size_in_bytes);
    assert_eq!(a.buffer, b.buffer);

    allocator.destroy(&device);
}

#[test]
pub fn test_cpu_pointers_are_writable() {
    let device = NullDevice::new();
    let mut allocator = TemporaryBufferAllocator::new(
        &device,
        256,
        BufferCreationFlags::ALLOW_UNIFORM_BUFFER,
        "test temp ring",
    );

    let slice = allocator.allocate_temporary_resource(4, 4);
    unsafe {
        std::ptr::copy_nonoverlapping([1u8, 2, 3, 4].as_ptr(), slice.cpu_ptr, 4);
        assert_eq!(3, *slice.cpu_ptr.add(2));
    }

    allocator.destroy(&device);
}

#[test]
pub fn test_flush_rolls_the_ring_and_reclaims() {
    let device = NullDevice::new();
    let mut allocator = TemporaryBufferAllocator::new(
        &device,
        128,
        BufferCreationFlags::ALLOW_UNIFORM_BUFFER,
        "test temp ring",
    );

    let frame0 = allocator.allocate_temporary_resource(128, 4);
    assert_eq!(128, allocator.used_bytes());

    allocator.flush(1);
    assert_eq!(0, allocator.used_bytes());
    let frame1 = allocator.allocate_temporary_resource(128, 4);
    assert_ne!(frame0.buffer, frame1.buffer);

    // Wrapping around the latency lands on the reclaimed frame 0 slot.
    allocator.flush(MAX_FRAME_LATENCY as u64);
    let frame3 = allocator.allocate_temporary_resource(64, 4);
    assert_eq!(frame0.buffer, frame3.buffer);
    assert_eq!(0, frame3.offset_in_bytes);

    allocator.destroy(&device);
}

#[test]
#[should_panic]
pub fn test_ring_entry_exhaustion_is_fatal() {
    let device = NullDevice::new();
    let mut allocator = TemporaryBufferAllocator::new(
        &device,
        64,
        BufferCreationFlags::ALLOW_UNIFORM_BUFFER,
        "test temp ring",
    );

    allocator.allocate_temporary_resource(64, 4);
    allocator.allocate_temporary_resource(1, 4);
}
