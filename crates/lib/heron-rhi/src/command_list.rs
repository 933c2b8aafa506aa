use bitflags::bitflags;

use crate::handles::{
    Buffer, ComputePipeline, DepthStencilView, RasterPipeline, RenderTargetView, Texture2D,
    Texture3D,
};
use crate::resource::{ClearValue, MipUploadDesc, TemporaryResource};

bitflags! {
    pub struct PipelineSyncStage: u32 {
        // Common
        const INDIRECT_COMMAND = 0x01;

        // Graphics pipeline
        const INPUT_ASSEMBLY       = 0x02;
        const VERTEX_SHADER        = 0x04;
        const PIXEL_SHADER         = 0x08;
        const EARLY_DEPTH_TEST     = 0x10;
        const LATE_DEPTH_TEST      = 0x20;
        const RENDER_TARGET_OUTPUT = 0x40;

        // Compute pipeline
        const COMPUTE_SHADER = 0x80;

        // Ray tracing pipeline
        const RAY_TRACING = 0x100;

        // Copy pipeline
        const COPY = 0x800;
    }
}

bitflags! {
    pub struct PipelineAccess: u32 {
        const COMMAND_INPUT           = 0x01;
        const VERTEX_INPUT            = 0x02;
        const INDEX_INPUT             = 0x04;
        const SHADER_READ             = 0x08;
        const SHADER_READ_WRITE       = 0x10;
        const RENDER_TARGET_WRITE     = 0x20;
        const DEPTH_TARGET_READ       = 0x40;
        const DEPTH_TARGET_READ_WRITE = 0x80;
        const COPY_READ               = 0x100;
        const COPY_WRITE              = 0x200;
        const UNIFORM_BUFFER          = 0x1000;
    }
}

/// The layout the GPU believes a texture's memory is in.
/// `Present` is exclusive with every other access.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TextureLayout {
    #[default]
    Undefined,

    RenderTarget,
    DepthTargetRead,
    DepthTargetReadWrite,
    ShaderRead,
    ShaderReadWrite,
    CopyRead,
    CopyWrite,
    Present,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LoadOp {
    #[default]
    DoNotCare,

    Load,
    Clear,
    Discard,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BufferBarrier {
    pub from_stage: PipelineSyncStage,
    pub to_stage: PipelineSyncStage,

    pub from_access: PipelineAccess,
    pub to_access: PipelineAccess,

    pub handle: Buffer,
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Texture2DBarrier {
    pub from_stage: PipelineSyncStage,
    pub to_stage: PipelineSyncStage,

    pub from_access: PipelineAccess,
    pub to_access: PipelineAccess,

    pub from_layout: TextureLayout,
    pub to_layout: TextureLayout,

    pub handle: Texture2D,

    pub first_mip_level: u32,
    pub num_mips: u32,

    pub first_array_slice: u32,
    pub num_array_slices: u32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Texture3DBarrier {
    pub from_stage: PipelineSyncStage,
    pub to_stage: PipelineSyncStage,

    pub from_access: PipelineAccess,
    pub to_access: PipelineAccess,

    pub from_layout: TextureLayout,
    pub to_layout: TextureLayout,

    pub handle: Texture3D,

    pub first_mip_level: u32,
    pub num_mips: u32,
}

#[derive(Clone, Copy, Default)]
pub struct BarrierDesc<'a> {
    pub buffer_barriers: &'a [BufferBarrier],
    pub texture_2d_barriers: &'a [Texture2DBarrier],
    pub texture_3d_barriers: &'a [Texture3DBarrier],
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct RenderPassRenderTarget {
    pub view: RenderTargetView,
    pub load_op: LoadOp,
    pub clear_value: ClearValue,
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct RenderPassDepthTarget {
    pub view: DepthStencilView,
    pub load_op: LoadOp,
    pub clear_value: ClearValue,
}

#[derive(Clone, Copy, Default)]
pub struct RenderPassBeginDesc<'a> {
    pub viewport: Viewport,
    pub render_targets: &'a [RenderPassRenderTarget],
    pub depth_target: RenderPassDepthTarget,
}

#[derive(Clone, Copy, Debug)]
pub struct DrawPacket {
    pub pipeline: RasterPipeline,

    pub vertex_count: u32,
    pub instance_count: u32,
    pub draw_id: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct IndexedDrawPacket {
    pub pipeline: RasterPipeline,

    pub index_buffer: Buffer,
    pub offset_in_index_buffer: u32,

    pub index_count: u32,
    pub instance_count: u32,
    pub draw_id: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct DispatchPacket {
    pub pipeline: ComputePipeline,

    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Recording surface of a single command stream.
///
/// Command lists are allocated from the device, recorded on exactly one
/// thread, and given back through `submit_command_lists`.
pub trait CommandList: Send {
    fn begin_event(&mut self, name: &str);
    fn end_event(&mut self);

    fn barrier(&mut self, desc: &BarrierDesc);

    fn begin_render_pass(&mut self, desc: &RenderPassBeginDesc);
    fn end_render_pass(&mut self);

    fn draw(&mut self, packets: &[DrawPacket]);
    fn draw_indexed(&mut self, packets: &[IndexedDrawPacket]);
    fn dispatch(&mut self, packets: &[DispatchPacket]);

    fn copy_buffer_region(
        &mut self,
        dest: Buffer,
        dest_offset_in_bytes: u32,
        src: Buffer,
        src_offset_in_bytes: u32,
        size_in_bytes: u32,
    );
    fn upload_buffer_data(&mut self, dest: Buffer, dest_offset_in_bytes: u32, data: &[u8]);
    fn upload_texture_data(
        &mut self,
        dest: Texture2D,
        start_mip_index: u32,
        mip_descs: &[MipUploadDesc],
        data: &[u8],
    );
    fn queue_buffer_readback(&mut self, src: Buffer, src_offset_in_bytes: u32, size_in_bytes: u32);

    /// Carve a slice out of the command list's host-visible scratch ring.
    fn allocate_temporary_resource(&mut self, size_in_bytes: u32, align: u32) -> TemporaryResource;

    /// Backend escape hatch, used by devices to take their own lists back at submit.
    fn as_any(&self) -> &dyn std::any::Any;
}
