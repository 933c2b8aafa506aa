use bitflags::bitflags;

use crate::format::{DepthFormat, RenderTargetFormat, TextureFormat};
use crate::handles::{Buffer, GpuAllocation, Texture2D, Texture3D};

bitflags! {
    pub struct GpuAllocationFlags: u32 {
        const DEVICE_ACCESS_OPTIMAL = 0x01;
        const HOST_VISIBLE          = 0x02;
        const HOST_COHERENT         = 0x04;
        const HOST_CACHED           = 0x08;
        const MEMORYLESS            = 0x10;

        const DEVICE_ONLY   = Self::DEVICE_ACCESS_OPTIMAL.bits;
        const HOST_UPLOAD   = Self::HOST_VISIBLE.bits | Self::HOST_COHERENT.bits | Self::HOST_CACHED.bits;
        const HOST_READBACK = Self::HOST_VISIBLE.bits | Self::HOST_CACHED.bits;
    }
}

bitflags! {
    pub struct BufferCreationFlags: u32 {
        const ALLOW_SHADER_READ_ONLY  = 0x01;
        const ALLOW_SHADER_READ_WRITE = 0x02;
        const ALLOW_UNIFORM_BUFFER    = 0x08;
    }
}

bitflags! {
    pub struct TextureCreationFlags: u32 {
        const ALLOW_SHADER_READ_ONLY    = 0x01;
        const ALLOW_SHADER_READ_WRITE   = 0x02;
        const ALLOW_RENDER_TARGET       = 0x04;
        const ALLOW_DEPTH_STENCIL_TARGET = 0x08;
    }
}

/// A span inside a device memory allocation that a resource lives on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GpuMemoryRegion {
    pub allocation: GpuAllocation,
    pub offset_in_allocation: u64,
    pub region_size: u64,
}

impl Default for GpuMemoryRegion {
    fn default() -> Self {
        Self {
            allocation: GpuAllocation::INVALID,
            offset_in_allocation: 0,
            region_size: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResourceFootprint {
    pub size_in_bytes: u64,
    pub alignment: u64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

impl ClearValue {
    pub const fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color([r, g, b, a])
    }

    pub const fn depth_stencil(depth: f32, stencil: u8) -> Self {
        Self::DepthStencil { depth, stencil }
    }
}

impl Default for ClearValue {
    fn default() -> Self {
        Self::Color([0.0; 4])
    }
}

/// Size comes from the memory region the buffer is created on.
#[derive(Clone, Copy, Debug)]
pub struct BufferDesc {
    pub flags: BufferCreationFlags,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct Texture2DDesc {
    pub flags: TextureCreationFlags,
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub opt_clear_value: Option<ClearValue>,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct Texture3DDesc {
    pub flags: TextureCreationFlags,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub opt_clear_value: Option<ClearValue>,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderTargetViewDesc {
    pub texture: Texture2D,
    pub format: RenderTargetFormat,
}

#[derive(Clone, Copy, Debug)]
pub struct DepthStencilViewDesc {
    pub texture: Texture2D,
    pub format: DepthFormat,
}

#[derive(Clone, Copy, Debug)]
pub struct Texture2DViewDesc {
    pub texture: Texture2D,
    pub format: TextureFormat,
    pub mip_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct Texture3DViewDesc {
    pub texture: Texture3D,
    pub format: TextureFormat,
    pub mip_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct RWTexture2DViewDesc {
    pub texture: Texture2D,
    pub format: TextureFormat,
    pub mip_index: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct RWTexture3DViewDesc {
    pub texture: Texture3D,
    pub format: TextureFormat,
    pub mip_index: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferViewDesc {
    pub buffer: Buffer,
    pub offset_in_bytes: u32,
    pub size_in_bytes: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct TypedBufferViewDesc {
    pub buffer: Buffer,
    pub offset_in_bytes: u32,
    pub element_size_in_bytes: u32,
    pub element_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct UniformBufferViewDesc {
    pub buffer: Buffer,
    pub offset_in_bytes: u32,
    pub size_in_bytes: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct RWBufferViewDesc {
    pub buffer: Buffer,
    pub offset_in_bytes: u32,
    pub size_in_bytes: u32,
}

/// Per-mip layout of a texture upload through a host-visible staging buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MipUploadDesc {
    pub offset_in_upload_buffer: u64,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub row_pitch: u32,
    pub row_count: u32,
    pub row_size_in_bytes: u64,
    pub total_size_in_bytes: u64,
}

/// A slice of host-visible memory handed out by a temporary allocator.
///
/// `cpu_ptr` points into the persistently mapped allocation backing the
/// buffer; it is only valid until the owning ring slot is flushed.
#[derive(Clone, Copy, Debug)]
pub struct TemporaryResource {
    pub buffer: Buffer,
    pub offset_in_bytes: u32,
    pub size_in_bytes: u32,
    pub cpu_ptr: *mut u8,
}
