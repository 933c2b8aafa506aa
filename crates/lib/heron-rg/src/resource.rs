//! Public resource vocabulary of the render graph: handles, descriptions,
//! registration descriptors for externally owned resources, and the usage
//! records passes declare their accesses with.

use bitflags::bitflags;

use heron_container::define_handle;
use heron_rhi::{
    ClearValue, DepthFormat, LoadOp, PipelineAccess, PipelineSyncStage, RenderTargetFormat,
    TextureFormat, TextureLayout,
};

define_handle!(pub struct Texture2D, salt = 0x20);
define_handle!(pub struct Texture3D, salt = 0x21);
define_handle!(pub struct Buffer, salt = 0x22);
define_handle!(pub struct Tlas, salt = 0x23);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TextureSizeMode {
    /// Width and height of the desc are divisors of the render output size
    /// of the first pass this texture is seen in.
    #[default]
    Adaptive,
    /// Width and height are taken as-is.
    Fixed,
}

bitflags! {
    pub struct ResourceFlags: u32 {
        /// Pinned resources live on a dedicated GPU allocation and keep
        /// their contents, device objects and memory across executions.
        const PINNED = 0x01;
    }
}

impl Default for ResourceFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextureAccess {
    ShaderReadOnly,
    ShaderReadWrite,

    CopySource,
    CopyDest,

    Presentation,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BufferAccess {
    ShaderReadOnly,
    ShaderReadWrite,

    CopySource,
    CopyDest,

    UniformBuffer,
    DrawIdBuffer,
    IndexBuffer,
    ArgumentBuffer,
}

bitflags! {
    pub struct ResourceReadWriteFlags: u32 {
        const SYNC_BEFORE_READ_WRITE_ACCESS = 0x01;
    }
}

impl Default for ResourceReadWriteFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Texture2DDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,

    pub format: TextureFormat,
    pub render_format: RenderTargetFormat,
    pub depth_format: DepthFormat,

    pub clear_value: ClearValue,
    pub size_mode: TextureSizeMode,
    pub flags: ResourceFlags,
    pub name: &'static str,
}

impl Default for Texture2DDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            mip_levels: 1,
            format: TextureFormat::Unknown,
            render_format: RenderTargetFormat::Unknown,
            depth_format: DepthFormat::Unknown,
            clear_value: ClearValue::default(),
            size_mode: TextureSizeMode::Adaptive,
            flags: ResourceFlags::empty(),
            name: "",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Texture3DDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,

    pub format: TextureFormat,
    pub flags: ResourceFlags,
    pub name: &'static str,
}

impl Default for Texture3DDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            mip_levels: 1,
            format: TextureFormat::Unknown,
            flags: ResourceFlags::empty(),
            name: "",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BufferDesc {
    pub size_in_bytes: u32,
    pub flags: ResourceFlags,
    pub name: &'static str,
}

impl Default for BufferDesc {
    fn default() -> Self {
        Self {
            size_in_bytes: 0,
            flags: ResourceFlags::empty(),
            name: "",
        }
    }
}

/// Wraps a texture the application owns so passes can reference it.
/// The graph creates and destroys nothing for registered resources; the
/// caller hands over the views along with the last known barrier state.
pub struct Texture2DRegistrationDesc<'a> {
    pub texture: heron_rhi::Texture2D,
    pub view: heron_rhi::Texture2DView,
    pub rw_views: &'a [heron_rhi::RWTexture2DView],

    pub rtv: heron_rhi::RenderTargetView,
    pub dsv: heron_rhi::DepthStencilView,

    pub clear_value: ClearValue,

    pub last_sync_stage: PipelineSyncStage,
    pub last_access: PipelineAccess,
    pub last_layout: TextureLayout,
    pub name: &'static str,
}

impl<'a> Default for Texture2DRegistrationDesc<'a> {
    fn default() -> Self {
        Self {
            texture: heron_rhi::Texture2D::INVALID,
            view: heron_rhi::Texture2DView::INVALID,
            rw_views: &[],
            rtv: heron_rhi::RenderTargetView::INVALID,
            dsv: heron_rhi::DepthStencilView::INVALID,
            clear_value: ClearValue::default(),
            last_sync_stage: PipelineSyncStage::empty(),
            last_access: PipelineAccess::empty(),
            last_layout: TextureLayout::Undefined,
            name: "",
        }
    }
}

pub struct Texture3DRegistrationDesc<'a> {
    pub texture: heron_rhi::Texture3D,
    pub view: heron_rhi::Texture3DView,
    pub rw_views: &'a [heron_rhi::RWTexture3DView],

    pub last_sync_stage: PipelineSyncStage,
    pub last_access: PipelineAccess,
    pub last_layout: TextureLayout,
    pub name: &'static str,
}

impl<'a> Default for Texture3DRegistrationDesc<'a> {
    fn default() -> Self {
        Self {
            texture: heron_rhi::Texture3D::INVALID,
            view: heron_rhi::Texture3DView::INVALID,
            rw_views: &[],
            last_sync_stage: PipelineSyncStage::empty(),
            last_access: PipelineAccess::empty(),
            last_layout: TextureLayout::Undefined,
            name: "",
        }
    }
}

pub struct BufferRegistrationDesc {
    pub buffer: heron_rhi::Buffer,
    pub size_in_bytes: u32,
    pub view: heron_rhi::BufferView,
    pub uniform_view: heron_rhi::UniformBufferView,
    pub typed_view: heron_rhi::TypedBufferView,
    pub rw_view: heron_rhi::RWBufferView,

    pub last_sync_stage: PipelineSyncStage,
    pub last_access: PipelineAccess,
    pub name: &'static str,
}

impl Default for BufferRegistrationDesc {
    fn default() -> Self {
        Self {
            buffer: heron_rhi::Buffer::INVALID,
            size_in_bytes: 0,
            view: heron_rhi::BufferView::INVALID,
            uniform_view: heron_rhi::UniformBufferView::INVALID,
            typed_view: heron_rhi::TypedBufferView::INVALID,
            rw_view: heron_rhi::RWBufferView::INVALID,
            last_sync_stage: PipelineSyncStage::empty(),
            last_access: PipelineAccess::empty(),
            name: "",
        }
    }
}

/// The concrete device-side location a graph buffer resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferRegion {
    pub buffer: heron_rhi::Buffer,
    pub offset: u32,
    pub size: u32,
}

impl Default for BufferRegion {
    fn default() -> Self {
        Self {
            buffer: heron_rhi::Buffer::INVALID,
            offset: 0,
            size: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TextureAttachment {
    pub texture: Texture2D,
    pub load_op: LoadOp,
}

impl Default for TextureAttachment {
    fn default() -> Self {
        Self {
            texture: Texture2D::INVALID,
            load_op: LoadOp::DoNotCare,
        }
    }
}

/// Declares one access a pass performs on a 2D texture.
#[derive(Clone, Copy, Debug)]
pub struct Texture2DUsage {
    pub texture: Texture2D,
    pub access: TextureAccess,

    pub mip_index: u32,
    pub rw_flags: ResourceReadWriteFlags,
}

impl Texture2DUsage {
    pub fn shader_read_only(texture: Texture2D) -> Self {
        Self {
            texture,
            access: TextureAccess::ShaderReadOnly,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn shader_read_write(texture: Texture2D, mip_index: u32) -> Self {
        Self {
            texture,
            access: TextureAccess::ShaderReadWrite,
            mip_index,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    /// Read-write access that must see every prior write in this pass chain.
    pub fn shader_read_write_synced(texture: Texture2D, mip_index: u32) -> Self {
        Self {
            rw_flags: ResourceReadWriteFlags::SYNC_BEFORE_READ_WRITE_ACCESS,
            ..Self::shader_read_write(texture, mip_index)
        }
    }

    pub fn copy_from(texture: Texture2D) -> Self {
        Self {
            texture,
            access: TextureAccess::CopySource,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn copy_to(texture: Texture2D) -> Self {
        Self {
            texture,
            access: TextureAccess::CopyDest,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn present(texture: Texture2D) -> Self {
        Self {
            texture,
            access: TextureAccess::Presentation,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }
}

/// Declares one access a pass performs on a 3D texture.
#[derive(Clone, Copy, Debug)]
pub struct Texture3DUsage {
    pub texture: Texture3D,
    pub access: TextureAccess,

    pub mip_index: u32,
    pub rw_flags: ResourceReadWriteFlags,
}

impl Texture3DUsage {
    pub fn shader_read_only(texture: Texture3D) -> Self {
        Self {
            texture,
            access: TextureAccess::ShaderReadOnly,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn shader_read_write(texture: Texture3D, mip_index: u32) -> Self {
        Self {
            texture,
            access: TextureAccess::ShaderReadWrite,
            mip_index,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn shader_read_write_synced(texture: Texture3D, mip_index: u32) -> Self {
        Self {
            rw_flags: ResourceReadWriteFlags::SYNC_BEFORE_READ_WRITE_ACCESS,
            ..Self::shader_read_write(texture, mip_index)
        }
    }

    pub fn copy_from(texture: Texture3D) -> Self {
        Self {
            texture,
            access: TextureAccess::CopySource,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn copy_to(texture: Texture3D) -> Self {
        Self {
            texture,
            access: TextureAccess::CopyDest,
            mip_index: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }
}

/// Declares one access a pass performs on a buffer.
#[derive(Clone, Copy, Debug)]
pub struct BufferUsage {
    pub buffer: Buffer,
    pub access: BufferAccess,

    /// Non-zero turns shader reads into a typed view of this element size.
    pub structure_size_in_bytes: u32,
    pub rw_flags: ResourceReadWriteFlags,
}

impl BufferUsage {
    fn new(buffer: Buffer, access: BufferAccess) -> Self {
        Self {
            buffer,
            access,
            structure_size_in_bytes: 0,
            rw_flags: ResourceReadWriteFlags::empty(),
        }
    }

    pub fn shader_read_only(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::ShaderReadOnly)
    }

    pub fn shader_read_only_typed(buffer: Buffer, structure_size_in_bytes: u32) -> Self {
        Self {
            structure_size_in_bytes,
            ..Self::new(buffer, BufferAccess::ShaderReadOnly)
        }
    }

    pub fn shader_read_write(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::ShaderReadWrite)
    }

    pub fn shader_read_write_synced(buffer: Buffer) -> Self {
        Self {
            rw_flags: ResourceReadWriteFlags::SYNC_BEFORE_READ_WRITE_ACCESS,
            ..Self::new(buffer, BufferAccess::ShaderReadWrite)
        }
    }

    pub fn uniform(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::UniformBuffer)
    }

    pub fn draw_id(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::DrawIdBuffer)
    }

    pub fn index(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::IndexBuffer)
    }

    pub fn argument(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::ArgumentBuffer)
    }

    pub fn copy_from(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::CopySource)
    }

    pub fn copy_to(buffer: Buffer) -> Self {
        Self::new(buffer, BufferAccess::CopyDest)
    }
}
