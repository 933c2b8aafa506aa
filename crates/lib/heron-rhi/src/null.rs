//! A device that talks to no GPU and records every call instead.
//!
//! Used by the render graph tests to assert exact creation, barrier and
//! submission sequences. Host-visible allocations are backed by real memory
//! so upload paths can write through their mapped pointers.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use parking_lot::Mutex;

use heron_container::Handle;

use crate::command_list::*;
use crate::device::Device;
use crate::format::bytes_per_pixel;
use crate::handles::*;
use crate::resource::*;
use crate::temporary::TemporaryBufferAllocator;

const NULL_CL_TEMP_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    GpuAlloc {
        allocation: GpuAllocation,
        size_in_bytes: u64,
        flags: GpuAllocationFlags,
    },
    GpuFree {
        allocation: GpuAllocation,
    },

    CreateBuffer {
        buffer: Buffer,
        name: &'static str,
        region: GpuMemoryRegion,
    },
    CreateTexture2D {
        texture: Texture2D,
        name: &'static str,
        width: u32,
        height: u32,
        mip_levels: u32,
        flags: TextureCreationFlags,
        region: GpuMemoryRegion,
    },
    CreateTexture3D {
        texture: Texture3D,
        name: &'static str,
        width: u32,
        height: u32,
        depth: u32,
        mip_levels: u32,
        flags: TextureCreationFlags,
        region: GpuMemoryRegion,
    },

    DestroyBuffer(Buffer),
    DestroyTexture2D(Texture2D),
    DestroyTexture3D(Texture3D),

    CreateTexture2DView {
        view: Texture2DView,
        texture: Texture2D,
    },
    CreateRWTexture2DView {
        view: RWTexture2DView,
        texture: Texture2D,
        mip_index: u32,
    },
    CreateTexture3DView {
        view: Texture3DView,
        texture: Texture3D,
    },
    CreateRWTexture3DView {
        view: RWTexture3DView,
        texture: Texture3D,
        mip_index: u32,
    },
    CreateRenderTargetView {
        view: RenderTargetView,
        texture: Texture2D,
    },
    CreateDepthStencilView {
        view: DepthStencilView,
        texture: Texture2D,
    },
    CreateBufferView {
        view: BufferView,
        buffer: Buffer,
    },
    CreateTypedBufferView {
        view: TypedBufferView,
        buffer: Buffer,
    },
    CreateUniformBufferView {
        view: UniformBufferView,
        buffer: Buffer,
    },
    CreateRWBufferView {
        view: RWBufferView,
        buffer: Buffer,
    },

    DestroyTexture2DView(Texture2DView),
    DestroyRWTexture2DView(RWTexture2DView),
    DestroyTexture3DView(Texture3DView),
    DestroyRWTexture3DView(RWTexture3DView),
    DestroyRenderTargetView(RenderTargetView),
    DestroyDepthStencilView(DepthStencilView),
    DestroyBufferView(BufferView),
    DestroyTypedBufferView(TypedBufferView),
    DestroyUniformBufferView(UniformBufferView),
    DestroyRWBufferView(RWBufferView),

    AllocateCommandList {
        id: u32,
    },
    SubmitCommandLists {
        ids: Vec<u32>,
    },
    EndFrame,
    DrainGpu,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginEvent(String),
    EndEvent,

    Barrier {
        buffer_barriers: Vec<BufferBarrier>,
        texture_2d_barriers: Vec<Texture2DBarrier>,
        texture_3d_barriers: Vec<Texture3DBarrier>,
    },

    BeginRenderPass {
        viewport: Viewport,
        render_targets: Vec<RenderPassRenderTarget>,
        depth_target: RenderPassDepthTarget,
    },
    EndRenderPass,

    Draw {
        packet_count: usize,
    },
    DrawIndexed {
        packet_count: usize,
    },
    Dispatch {
        packet_count: usize,
    },

    CopyBufferRegion {
        dest: Buffer,
        dest_offset_in_bytes: u32,
        src: Buffer,
        src_offset_in_bytes: u32,
        size_in_bytes: u32,
    },
    UploadBufferData {
        dest: Buffer,
        dest_offset_in_bytes: u32,
        size_in_bytes: usize,
    },
    UploadTextureData {
        dest: Texture2D,
        start_mip_index: u32,
        mip_count: usize,
        size_in_bytes: usize,
    },
    QueueBufferReadback {
        src: Buffer,
        src_offset_in_bytes: u32,
        size_in_bytes: u32,
    },

    AllocateTemporaryResource {
        size_in_bytes: u32,
        align: u32,
    },
}

struct NullState {
    calls: Mutex<Vec<DeviceCall>>,
    command_logs: Mutex<HashMap<u32, Vec<RecordedCommand>>>,
    host_memory: Mutex<HashMap<u64, Box<[u8]>>>,

    next_index: AtomicU32,
    next_command_list_id: AtomicU32,
}

/// See the module docs. Cloning shares the recorded state.
#[derive(Clone)]
pub struct NullDevice {
    state: Arc<NullState>,
}

impl NullDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(NullState {
                calls: Mutex::new(Vec::new()),
                command_logs: Mutex::new(HashMap::new()),
                host_memory: Mutex::new(HashMap::new()),
                next_index: AtomicU32::new(1),
                next_command_list_id: AtomicU32::new(0),
            }),
        }
    }

    fn next_index(&self) -> u32 {
        self.state.next_index.fetch_add(1, Ordering::Relaxed)
    }

    fn record(&self, call: DeviceCall) {
        self.state.calls.lock().push(call);
    }

    /// Full device call history, in call order.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.calls.lock().clone()
    }

    pub fn call_count(&self, matcher: impl Fn(&DeviceCall) -> bool) -> usize {
        self.state.calls.lock().iter().filter(|c| matcher(c)).count()
    }

    /// Commands recorded into one command list, in record order.
    pub fn commands(&self, command_list_id: u32) -> Vec<RecordedCommand> {
        self.state
            .command_logs
            .lock()
            .get(&command_list_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Command list ids of every `submit_command_lists` call, in order.
    pub fn submissions(&self) -> Vec<Vec<u32>> {
        self.state
            .calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::SubmitCommandLists { ids } => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    /// Commands of every submitted list, flattened in submission order.
    pub fn submitted_commands(&self) -> Vec<RecordedCommand> {
        self.submissions()
            .into_iter()
            .flatten()
            .flat_map(|id| self.commands(id))
            .collect()
    }
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for NullDevice {
    fn gpu_alloc(&self, size_in_bytes: u64, flags: GpuAllocationFlags) -> GpuAllocation {
        let allocation = GpuAllocation::assemble(self.next_index(), 0);

        if flags.contains(GpuAllocationFlags::HOST_VISIBLE) {
            self.state.host_memory.lock().insert(
                allocation.as_raw(),
                vec![0u8; size_in_bytes as usize].into_boxed_slice(),
            );
        }

        self.record(DeviceCall::GpuAlloc {
            allocation,
            size_in_bytes,
            flags,
        });
        allocation
    }

    fn gpu_free(&self, allocation: GpuAllocation) {
        self.state.host_memory.lock().remove(&allocation.as_raw());
        self.record(DeviceCall::GpuFree { allocation });
    }

    fn map_allocation(&self, allocation: GpuAllocation) -> *mut u8 {
        let mut memory = self.state.host_memory.lock();
        let slab = memory
            .get_mut(&allocation.as_raw())
            .expect("Mapped an allocation that is not host-visible!");
        slab.as_mut_ptr()
    }

    fn calculate_texture_2d_footprint(&self, desc: &Texture2DDesc) -> ResourceFootprint {
        let mut size = 0u64;
        for mip in 0..desc.mip_levels {
            let w = (desc.width >> mip).max(1) as u64;
            let h = (desc.height >> mip).max(1) as u64;
            size += w * h * bytes_per_pixel(desc.format);
        }

        ResourceFootprint {
            size_in_bytes: size * desc.array_size.max(1) as u64,
            alignment: crate::transient::TRANSIENT_PAGE_SIZE,
        }
    }

    fn calculate_texture_3d_footprint(&self, desc: &Texture3DDesc) -> ResourceFootprint {
        let mut size = 0u64;
        for mip in 0..desc.mip_levels {
            let w = (desc.width >> mip).max(1) as u64;
            let h = (desc.height >> mip).max(1) as u64;
            let d = (desc.depth >> mip).max(1) as u64;
            size += w * h * d * bytes_per_pixel(desc.format);
        }

        ResourceFootprint {
            size_in_bytes: size,
            alignment: crate::transient::TRANSIENT_PAGE_SIZE,
        }
    }

    fn calculate_mip_upload_descs(&self, desc: &Texture2DDesc) -> Vec<MipUploadDesc> {
        let mut offset = 0u64;
        (0..desc.mip_levels)
            .map(|mip| {
                let width = (desc.width >> mip).max(1);
                let height = (desc.height >> mip).max(1);
                let row_size = width as u64 * bytes_per_pixel(desc.format);
                let total = row_size * height as u64;

                let upload = MipUploadDesc {
                    offset_in_upload_buffer: offset,
                    format: desc.format,
                    width,
                    height,
                    depth: 1,
                    row_pitch: row_size as u32,
                    row_count: height,
                    row_size_in_bytes: row_size,
                    total_size_in_bytes: total,
                };
                offset += total;
                upload
            })
            .collect()
    }

    fn create_buffer(&self, desc: &BufferDesc, region: &GpuMemoryRegion) -> Buffer {
        let buffer = Buffer::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateBuffer {
            buffer,
            name: desc.name,
            region: *region,
        });
        buffer
    }

    fn create_texture_2d(&self, desc: &Texture2DDesc, region: &GpuMemoryRegion) -> Texture2D {
        let texture = Texture2D::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateTexture2D {
            texture,
            name: desc.name,
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels,
            flags: desc.flags,
            region: *region,
        });
        texture
    }

    fn create_texture_3d(&self, desc: &Texture3DDesc, region: &GpuMemoryRegion) -> Texture3D {
        let texture = Texture3D::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateTexture3D {
            texture,
            name: desc.name,
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            mip_levels: desc.mip_levels,
            flags: desc.flags,
            region: *region,
        });
        texture
    }

    fn destroy_buffer(&self, buffer: Buffer) {
        self.record(DeviceCall::DestroyBuffer(buffer));
    }

    fn destroy_texture_2d(&self, texture: Texture2D) {
        self.record(DeviceCall::DestroyTexture2D(texture));
    }

    fn destroy_texture_3d(&self, texture: Texture3D) {
        self.record(DeviceCall::DestroyTexture3D(texture));
    }

    fn create_texture_2d_view(&self, desc: &Texture2DViewDesc) -> Texture2DView {
        let view = Texture2DView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateTexture2DView {
            view,
            texture: desc.texture,
        });
        view
    }

    fn create_rw_texture_2d_view(&self, desc: &RWTexture2DViewDesc) -> RWTexture2DView {
        let view = RWTexture2DView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateRWTexture2DView {
            view,
            texture: desc.texture,
            mip_index: desc.mip_index,
        });
        view
    }

    fn create_texture_3d_view(&self, desc: &Texture3DViewDesc) -> Texture3DView {
        let view = Texture3DView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateTexture3DView {
            view,
            texture: desc.texture,
        });
        view
    }

    fn create_rw_texture_3d_view(&self, desc: &RWTexture3DViewDesc) -> RWTexture3DView {
        let view = RWTexture3DView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateRWTexture3DView {
            view,
            texture: desc.texture,
            mip_index: desc.mip_index,
        });
        view
    }

    fn create_render_target_view(&self, desc: &RenderTargetViewDesc) -> RenderTargetView {
        let view = RenderTargetView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateRenderTargetView {
            view,
            texture: desc.texture,
        });
        view
    }

    fn create_depth_stencil_view(&self, desc: &DepthStencilViewDesc) -> DepthStencilView {
        let view = DepthStencilView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateDepthStencilView {
            view,
            texture: desc.texture,
        });
        view
    }

    fn create_buffer_view(&self, desc: &BufferViewDesc) -> BufferView {
        let view = BufferView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateBufferView {
            view,
            buffer: desc.buffer,
        });
        view
    }

    fn create_typed_buffer_view(&self, desc: &TypedBufferViewDesc) -> TypedBufferView {
        let view = TypedBufferView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateTypedBufferView {
            view,
            buffer: desc.buffer,
        });
        view
    }

    fn create_uniform_buffer_view(&self, desc: &UniformBufferViewDesc) -> UniformBufferView {
        let view = UniformBufferView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateUniformBufferView {
            view,
            buffer: desc.buffer,
        });
        view
    }

    fn create_rw_buffer_view(&self, desc: &RWBufferViewDesc) -> RWBufferView {
        let view = RWBufferView::assemble(self.next_index(), 0);
        self.record(DeviceCall::CreateRWBufferView {
            view,
            buffer: desc.buffer,
        });
        view
    }

    fn destroy_texture_2d_view(&self, view: Texture2DView) {
        self.record(DeviceCall::DestroyTexture2DView(view));
    }

    fn destroy_rw_texture_2d_view(&self, view: RWTexture2DView) {
        self.record(DeviceCall::DestroyRWTexture2DView(view));
    }

    fn destroy_texture_3d_view(&self, view: Texture3DView) {
        self.record(DeviceCall::DestroyTexture3DView(view));
    }

    fn destroy_rw_texture_3d_view(&self, view: RWTexture3DView) {
        self.record(DeviceCall::DestroyRWTexture3DView(view));
    }

    fn destroy_render_target_view(&self, view: RenderTargetView) {
        self.record(DeviceCall::DestroyRenderTargetView(view));
    }

    fn destroy_depth_stencil_view(&self, view: DepthStencilView) {
        self.record(DeviceCall::DestroyDepthStencilView(view));
    }

    fn destroy_buffer_view(&self, view: BufferView) {
        self.record(DeviceCall::DestroyBufferView(view));
    }

    fn destroy_typed_buffer_view(&self, view: TypedBufferView) {
        self.record(DeviceCall::DestroyTypedBufferView(view));
    }

    fn destroy_uniform_buffer_view(&self, view: UniformBufferView) {
        self.record(DeviceCall::DestroyUniformBufferView(view));
    }

    fn destroy_rw_buffer_view(&self, view: RWBufferView) {
        self.record(DeviceCall::DestroyRWBufferView(view));
    }

    fn allocate_command_list(&self) -> Box<dyn CommandList> {
        let id = self.state.next_command_list_id.fetch_add(1, Ordering::Relaxed);
        self.record(DeviceCall::AllocateCommandList { id });
        self.state.command_logs.lock().insert(id, Vec::new());

        Box::new(NullCommandList {
            id,
            device: self.clone(),
            temp: None,
        })
    }

    fn submit_command_lists(&self, lists: Vec<Box<dyn CommandList>>) {
        let ids = lists
            .iter()
            .map(|list| {
                list.as_any()
                    .downcast_ref::<NullCommandList>()
                    .expect("Submitted a command list from a different backend!")
                    .id
            })
            .collect();

        self.record(DeviceCall::SubmitCommandLists { ids });
    }

    fn end_frame(&self) {
        self.record(DeviceCall::EndFrame);
    }

    fn drain_gpu(&self) {
        self.record(DeviceCall::DrainGpu);
    }
}

pub struct NullCommandList {
    id: u32,
    device: NullDevice,
    /// Created on first temporary allocation so untouched lists record no
    /// buffer traffic of their own.
    temp: Option<TemporaryBufferAllocator>,
}

impl NullCommandList {
    pub fn id(&self) -> u32 {
        self.id
    }

    fn push(&self, command: RecordedCommand) {
        self.device
            .state
            .command_logs
            .lock()
            .get_mut(&self.id)
            .unwrap()
            .push(command);
    }
}

impl CommandList for NullCommandList {
    fn begin_event(&mut self, name: &str) {
        self.push(RecordedCommand::BeginEvent(name.to_owned()));
    }

    fn end_event(&mut self) {
        self.push(RecordedCommand::EndEvent);
    }

    fn barrier(&mut self, desc: &BarrierDesc) {
        self.push(RecordedCommand::Barrier {
            buffer_barriers: desc.buffer_barriers.to_vec(),
            texture_2d_barriers: desc.texture_2d_barriers.to_vec(),
            texture_3d_barriers: desc.texture_3d_barriers.to_vec(),
        });
    }

    fn begin_render_pass(&mut self, desc: &RenderPassBeginDesc) {
        self.push(RecordedCommand::BeginRenderPass {
            viewport: desc.viewport,
            render_targets: desc.render_targets.to_vec(),
            depth_target: desc.depth_target,
        });
    }

    fn end_render_pass(&mut self) {
        self.push(RecordedCommand::EndRenderPass);
    }

    fn draw(&mut self, packets: &[DrawPacket]) {
        self.push(RecordedCommand::Draw {
            packet_count: packets.len(),
        });
    }

    fn draw_indexed(&mut self, packets: &[IndexedDrawPacket]) {
        self.push(RecordedCommand::DrawIndexed {
            packet_count: packets.len(),
        });
    }

    fn dispatch(&mut self, packets: &[DispatchPacket]) {
        self.push(RecordedCommand::Dispatch {
            packet_count: packets.len(),
        });
    }

    fn copy_buffer_region(
        &mut self,
        dest: Buffer,
        dest_offset_in_bytes: u32,
        src: Buffer,
        src_offset_in_bytes: u32,
        size_in_bytes: u32,
    ) {
        self.push(RecordedCommand::CopyBufferRegion {
            dest,
            dest_offset_in_bytes,
            src,
            src_offset_in_bytes,
            size_in_bytes,
        });
    }

    fn upload_buffer_data(&mut self, dest: Buffer, dest_offset_in_bytes: u32, data: &[u8]) {
        self.push(RecordedCommand::UploadBufferData {
            dest,
            dest_offset_in_bytes,
            size_in_bytes: data.len(),
        });
    }

    fn upload_texture_data(
        &mut self,
        dest: Texture2D,
        start_mip_index: u32,
        mip_descs: &[MipUploadDesc],
        data: &[u8],
    ) {
        self.push(RecordedCommand::UploadTextureData {
            dest,
            start_mip_index,
            mip_count: mip_descs.len(),
            size_in_bytes: data.len(),
        });
    }

    fn queue_buffer_readback(
        &mut self,
        src: Buffer,
        src_offset_in_bytes: u32,
        size_in_bytes: u32,
    ) {
        self.push(RecordedCommand::QueueBufferReadback {
            src,
            src_offset_in_bytes,
            size_in_bytes,
        });
    }

    fn allocate_temporary_resource(&mut self, size_in_bytes: u32, align: u32) -> TemporaryResource {
        self.push(RecordedCommand::AllocateTemporaryResource {
            size_in_bytes,
            align,
        });

        let device = self.device.clone();
        let temp = self.temp.get_or_insert_with(|| {
            TemporaryBufferAllocator::new(
                &device,
                NULL_CL_TEMP_BYTES,
                BufferCreationFlags::ALLOW_SHADER_READ_ONLY
                    | BufferCreationFlags::ALLOW_UNIFORM_BUFFER,
                "null command list temp",
            )
        });

        temp.allocate_temporary_resource(size_in_bytes, align)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for NullCommandList {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            temp.destroy(&self.device);
        }
    }
}
