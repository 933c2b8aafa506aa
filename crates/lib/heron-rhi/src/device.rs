use crate::command_list::CommandList;
use crate::handles::*;
use crate::resource::*;

/// The device side of the rendering hardware interface.
///
/// The render graph consumes the device exclusively through this trait;
/// creation failures abort inside the backend with the device's diagnostic
/// message, so every method hands back a plain handle.
///
/// Thread safety contract: all methods may be called from any thread.
pub trait Device: Send + Sync {
    // Memory
    fn gpu_alloc(&self, size_in_bytes: u64, flags: GpuAllocationFlags) -> GpuAllocation;
    fn gpu_free(&self, allocation: GpuAllocation);

    /// Persistent CPU mapping of a host-visible allocation.
    fn map_allocation(&self, allocation: GpuAllocation) -> *mut u8;

    // Footprint queries
    fn calculate_texture_2d_footprint(&self, desc: &Texture2DDesc) -> ResourceFootprint;
    fn calculate_texture_3d_footprint(&self, desc: &Texture3DDesc) -> ResourceFootprint;
    fn calculate_mip_upload_descs(&self, desc: &Texture2DDesc) -> Vec<MipUploadDesc>;

    // Resources. Each is placed on the given region of an existing allocation.
    fn create_buffer(&self, desc: &BufferDesc, region: &GpuMemoryRegion) -> Buffer;
    fn create_texture_2d(&self, desc: &Texture2DDesc, region: &GpuMemoryRegion) -> Texture2D;
    fn create_texture_3d(&self, desc: &Texture3DDesc, region: &GpuMemoryRegion) -> Texture3D;

    fn destroy_buffer(&self, buffer: Buffer);
    fn destroy_texture_2d(&self, texture: Texture2D);
    fn destroy_texture_3d(&self, texture: Texture3D);

    // Views. Slim view handle values are bindless descriptor indices.
    fn create_texture_2d_view(&self, desc: &Texture2DViewDesc) -> Texture2DView;
    fn create_rw_texture_2d_view(&self, desc: &RWTexture2DViewDesc) -> RWTexture2DView;
    fn create_texture_3d_view(&self, desc: &Texture3DViewDesc) -> Texture3DView;
    fn create_rw_texture_3d_view(&self, desc: &RWTexture3DViewDesc) -> RWTexture3DView;
    fn create_render_target_view(&self, desc: &RenderTargetViewDesc) -> RenderTargetView;
    fn create_depth_stencil_view(&self, desc: &DepthStencilViewDesc) -> DepthStencilView;
    fn create_buffer_view(&self, desc: &BufferViewDesc) -> BufferView;
    fn create_typed_buffer_view(&self, desc: &TypedBufferViewDesc) -> TypedBufferView;
    fn create_uniform_buffer_view(&self, desc: &UniformBufferViewDesc) -> UniformBufferView;
    fn create_rw_buffer_view(&self, desc: &RWBufferViewDesc) -> RWBufferView;

    fn destroy_texture_2d_view(&self, view: Texture2DView);
    fn destroy_rw_texture_2d_view(&self, view: RWTexture2DView);
    fn destroy_texture_3d_view(&self, view: Texture3DView);
    fn destroy_rw_texture_3d_view(&self, view: RWTexture3DView);
    fn destroy_render_target_view(&self, view: RenderTargetView);
    fn destroy_depth_stencil_view(&self, view: DepthStencilView);
    fn destroy_buffer_view(&self, view: BufferView);
    fn destroy_typed_buffer_view(&self, view: TypedBufferView);
    fn destroy_uniform_buffer_view(&self, view: UniformBufferView);
    fn destroy_rw_buffer_view(&self, view: RWBufferView);

    // Command streams
    fn allocate_command_list(&self) -> Box<dyn CommandList>;

    /// Queue the given lists for execution, in slice order.
    fn submit_command_lists(&self, lists: Vec<Box<dyn CommandList>>);

    fn end_frame(&self);
    fn drain_gpu(&self);
}
