use crate::device::Device;
use crate::handles::Buffer;
use crate::resource::{
    BufferCreationFlags, BufferDesc, GpuAllocationFlags, GpuMemoryRegion, TemporaryResource,
};

use heron_container::Handle;

pub const MAX_FRAME_LATENCY: usize = 3;

struct RingEntry {
    allocation: crate::handles::GpuAllocation,
    buffer: Buffer,
    cpu_base: *mut u8,
    cursor: u64,
}

/// Ring of host-visible buffers for uploads and readbacks.
///
/// One buffer per in-flight frame; `allocate_temporary_resource` carves
/// slices from the entry selected by the last `flush`. Flushing to a frame
/// index reclaims that slot, which is only correct once the GPU work of the
/// frame that used it has retired (the device's frame fence guarantees this
/// before `flush` is called).
pub struct TemporaryBufferAllocator {
    entries: Vec<RingEntry>,
    size_per_frame: u64,
    current: usize,
}

// The cpu pointers target persistently mapped device memory; a single thread
// carves from the allocator at a time per the command list contract.
unsafe impl Send for TemporaryBufferAllocator {}

impl TemporaryBufferAllocator {
    pub fn new(
        device: &dyn Device,
        size_per_frame: u64,
        creation_flags: BufferCreationFlags,
        name: &'static str,
    ) -> Self {
        assert!(size_per_frame > 0);

        let entries = (0..MAX_FRAME_LATENCY)
            .map(|_| {
                let allocation = device.gpu_alloc(size_per_frame, GpuAllocationFlags::HOST_UPLOAD);
                let buffer = device.create_buffer(
                    &BufferDesc {
                        flags: creation_flags,
                        name,
                    },
                    &GpuMemoryRegion {
                        allocation,
                        offset_in_allocation: 0,
                        region_size: size_per_frame,
                    },
                );

                RingEntry {
                    allocation,
                    buffer,
                    cpu_base: device.map_allocation(allocation),
                    cursor: 0,
                }
            })
            .collect();

        Self {
            entries,
            size_per_frame,
            current: 0,
        }
    }

    pub fn allocate_temporary_resource(
        &mut self,
        size_in_bytes: u32,
        align: u32,
    ) -> TemporaryResource {
        assert!(align.is_power_of_two());

        let entry = &mut self.entries[self.current];
        let offset = (entry.cursor + align as u64 - 1) & !(align as u64 - 1);
        assert!(
            offset + size_in_bytes as u64 <= self.size_per_frame,
            "Temporary buffer ring entry exhausted ({} of {} bytes used, requested {})!",
            entry.cursor,
            self.size_per_frame,
            size_in_bytes
        );

        entry.cursor = offset + size_in_bytes as u64;

        TemporaryResource {
            buffer: entry.buffer,
            offset_in_bytes: offset as u32,
            size_in_bytes,
            cpu_ptr: unsafe { entry.cpu_base.add(offset as usize) },
        }
    }

    /// Roll the ring onto the slot of `frame_index` and reclaim it.
    pub fn flush(&mut self, frame_index: u64) {
        self.current = (frame_index % MAX_FRAME_LATENCY as u64) as usize;
        self.entries[self.current].cursor = 0;
    }

    /// Current write offset of the active ring entry.
    pub fn used_bytes(&self) -> u64 {
        self.entries[self.current].cursor
    }

    pub fn destroy(mut self, device: &dyn Device) {
        for entry in self.entries.drain(..) {
            if entry.buffer.is_valid() {
                device.destroy_buffer(entry.buffer);
            }
            device.gpu_free(entry.allocation);
        }
    }
}
