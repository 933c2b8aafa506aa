use std::sync::Arc;

use arrayvec::ArrayVec;

use heron_container::Handle;
use heron_rhi::{Device, TransientMemoryAllocator, Viewport};

use crate::build;
use crate::execute;
use crate::graph_resource::*;
use crate::pass::{
    execute_trampoline, PassBuildData, PassExecutionData, PassPayload, RenderGraphExecutionFlags,
    RenderPassDesc,
};
use crate::resource::*;

use heron_container::BumpAllocator;

/// Declarative per-frame graph of GPU work.
///
/// A frame goes `reset` → declare resources and passes → `build` →
/// `execute`. Building materializes transient resources, creates views and
/// plans every inter-pass barrier; executing records and submits the
/// declared passes in order. The graph is "closed" outside of the
/// declaration window and every API asserts the state it requires.
pub struct RenderGraph {
    pub(crate) device: Arc<dyn Device>,

    pub(crate) texture_2ds: Texture2DPool,
    pub(crate) texture_3ds: Texture3DPool,
    pub(crate) buffers: BufferPool,

    pub(crate) texture_2d_handles: Vec<Texture2D>,
    pub(crate) texture_3d_handles: Vec<Texture3D>,
    pub(crate) buffer_handles: Vec<Buffer>,

    viewport_stack: ArrayVec<Viewport, MAX_VIEWPORT_STACK_SIZE>,

    pub(crate) pass_build: Vec<PassBuildData>,
    pub(crate) pass_execution: Vec<PassExecutionData>,

    pub(crate) scratch: BumpAllocator,
    pub(crate) resource_allocator: TransientMemoryAllocator,

    pub(crate) is_closed: bool,
}

impl RenderGraph {
    pub fn new(device: Arc<dyn Device>) -> Self {
        let resource_allocator =
            TransientMemoryAllocator::new(device.clone(), TRANSIENT_PAGES_PER_BACKING);

        Self {
            device,
            texture_2ds: Texture2DPool::new(RESOURCE_POOL_CAPACITY),
            texture_3ds: Texture3DPool::new(RESOURCE_POOL_CAPACITY),
            buffers: BufferPool::new(RESOURCE_POOL_CAPACITY),
            texture_2d_handles: Vec::new(),
            texture_3d_handles: Vec::new(),
            buffer_handles: Vec::new(),
            viewport_stack: ArrayVec::new(),
            pass_build: Vec::with_capacity(MAX_RENDER_PASS_COUNT),
            pass_execution: Vec::with_capacity(MAX_RENDER_PASS_COUNT),
            scratch: BumpAllocator::new(SCRATCH_ARENA_BYTES),
            resource_allocator,
            is_closed: true,
        }
    }

    #[inline]
    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub(crate) fn resources(&self) -> RenderGraphResources {
        RenderGraphResources {
            texture_2ds: &self.texture_2ds,
            texture_3ds: &self.texture_3ds,
            buffers: &self.buffers,
        }
    }

    /// Open the graph for the next frame.
    ///
    /// Internal resources of the previous frame are destroyed here, except
    /// pinned ones which keep their memory and device objects.
    pub fn reset(&mut self, viewport: Viewport) {
        assert!(self.is_closed, "reset() on a graph that is still open!");

        self.destroy_frame_resources(false);

        self.viewport_stack.clear();
        self.viewport_stack.push(viewport);
        self.pass_build.clear();
        self.pass_execution.clear();
        self.scratch.reset();
        self.is_closed = false;
    }

    pub fn allocate_texture_2d(&mut self, desc: Texture2DDesc) -> Texture2D {
        assert!(!self.is_closed, "allocate_texture_2d() on a closed graph!");

        let run_data = Texture2DRunData {
            clear_value: desc.clear_value,
            ..Default::default()
        };
        let handle = self
            .texture_2ds
            .store(run_data, Texture2DBuildData::internal(desc));
        assert!(handle.is_valid(), "Render graph texture pool exhausted!");

        self.texture_2d_handles.push(handle);
        handle
    }

    pub fn allocate_texture_3d(&mut self, desc: Texture3DDesc) -> Texture3D {
        assert!(!self.is_closed, "allocate_texture_3d() on a closed graph!");

        let handle = self
            .texture_3ds
            .store(Texture3DRunData::default(), Texture3DBuildData::internal(desc));
        assert!(handle.is_valid(), "Render graph texture pool exhausted!");

        self.texture_3d_handles.push(handle);
        handle
    }

    pub fn allocate_buffer(&mut self, desc: BufferDesc) -> Buffer {
        assert!(!self.is_closed, "allocate_buffer() on a closed graph!");

        let handle = self
            .buffers
            .store(BufferRunData::default(), BufferBuildData::internal(desc));
        assert!(handle.is_valid(), "Render graph buffer pool exhausted!");

        self.buffer_handles.push(handle);
        handle
    }

    /// Wrap a texture owned by the caller. The graph never creates or
    /// destroys anything for it, it only tracks barrier state.
    pub fn register_texture_2d(&mut self, desc: &Texture2DRegistrationDesc) -> Texture2D {
        assert!(!self.is_closed, "register_texture_2d() on a closed graph!");

        let mut build_data = Texture2DBuildData::internal(Texture2DDesc {
            name: desc.name,
            ..Default::default()
        });
        build_data.ownership = ResourceOwnership::External;
        build_data.barrier.curr_sync_stage = desc.last_sync_stage;
        build_data.barrier.curr_access = desc.last_access;
        build_data.barrier.curr_layout = desc.last_layout;

        let mut run_data = Texture2DRunData {
            rhi_texture: desc.texture,
            view: desc.view,
            rtv: desc.rtv,
            dsv: desc.dsv,
            clear_value: desc.clear_value,
            ..Default::default()
        };
        for (slot, view) in run_data
            .rw_views
            .iter_mut()
            .zip(desc.rw_views.iter().take(MAX_RW_VIEWS))
        {
            *slot = *view;
        }

        let handle = self.texture_2ds.store(run_data, build_data);
        assert!(handle.is_valid(), "Render graph texture pool exhausted!");

        self.texture_2d_handles.push(handle);
        handle
    }

    pub fn register_texture_3d(&mut self, desc: &Texture3DRegistrationDesc) -> Texture3D {
        assert!(!self.is_closed, "register_texture_3d() on a closed graph!");

        let mut build_data = Texture3DBuildData::internal(Texture3DDesc {
            name: desc.name,
            ..Default::default()
        });
        build_data.ownership = ResourceOwnership::External;
        build_data.barrier.curr_sync_stage = desc.last_sync_stage;
        build_data.barrier.curr_access = desc.last_access;
        build_data.barrier.curr_layout = desc.last_layout;

        let mut run_data = Texture3DRunData {
            rhi_texture: desc.texture,
            view: desc.view,
            ..Default::default()
        };
        for (slot, view) in run_data
            .rw_views
            .iter_mut()
            .zip(desc.rw_views.iter().take(MAX_RW_VIEWS))
        {
            *slot = *view;
        }

        let handle = self.texture_3ds.store(run_data, build_data);
        assert!(handle.is_valid(), "Render graph texture pool exhausted!");

        self.texture_3d_handles.push(handle);
        handle
    }

    pub fn register_buffer(&mut self, desc: &BufferRegistrationDesc) -> Buffer {
        assert!(!self.is_closed, "register_buffer() on a closed graph!");

        let mut build_data = BufferBuildData::internal(BufferDesc {
            size_in_bytes: desc.size_in_bytes,
            name: desc.name,
            ..Default::default()
        });
        build_data.ownership = ResourceOwnership::External;
        build_data.barrier.curr_sync_stage = desc.last_sync_stage;
        build_data.barrier.curr_access = desc.last_access;

        let run_data = BufferRunData {
            buffer: BufferRegion {
                buffer: desc.buffer,
                offset: 0,
                size: desc.size_in_bytes,
            },
            view: desc.view,
            typed_view: desc.typed_view,
            uniform_view: desc.uniform_view,
            rw_view: desc.rw_view,
            ..Default::default()
        };

        let handle = self.buffers.store(run_data, build_data);
        assert!(handle.is_valid(), "Render graph buffer pool exhausted!");

        self.buffer_handles.push(handle);
        handle
    }

    pub fn push_viewport(&mut self, viewport: Viewport) {
        assert!(
            self.viewport_stack.len() < MAX_VIEWPORT_STACK_SIZE,
            "Viewport stack overflow!"
        );
        self.viewport_stack.push(viewport);
    }

    pub fn pop_viewport(&mut self) {
        assert!(self.viewport_stack.len() > 1, "Viewport stack underflow!");
        self.viewport_stack.pop();
    }

    pub fn current_viewport(&self) -> &Viewport {
        self.viewport_stack
            .last()
            .expect("No viewport, reset() the graph first!")
    }

    /// Append a pass. Usage lists and the `data` payload are copied into the
    /// frame arena; declaration order is execution and submission order.
    pub fn add_render_pass<T>(&mut self, desc: &RenderPassDesc<T>, data: &T)
    where
        T: Copy + Sync + 'static,
    {
        assert!(!self.is_closed, "add_render_pass() on a closed graph!");
        assert!(
            self.pass_build.len() < MAX_RENDER_PASS_COUNT,
            "Too many passes in one graph ({})!",
            MAX_RENDER_PASS_COUNT
        );

        let payload = self.scratch.alloc_value(PassPayload {
            func: desc.on_execute,
            data: *data,
        });

        self.pass_execution.push(PassExecutionData {
            name: desc.name,
            flags: desc.flags,
            viewport: *self.current_viewport(),
            trampoline: execute_trampoline::<T>,
            payload: payload.as_ptr() as *const (),
            ..Default::default()
        });

        self.pass_build.push(PassBuildData {
            name: desc.name,
            flags: desc.flags,
            color_attachments: self.scratch.alloc_slice_copy(desc.color_attachments),
            depth_attachment: desc.depth_attachment,
            texture_2ds: self.scratch.alloc_slice_copy(desc.texture_2ds),
            texture_3ds: self.scratch.alloc_slice_copy(desc.texture_3ds),
            buffers: self.scratch.alloc_slice_copy(desc.buffers),
            tlases: self.scratch.alloc_slice_copy(desc.tlases),
        });
    }

    /// Close the graph: infer creation flags and lifetimes, materialize
    /// every internal resource, and plan all inter-pass barriers.
    pub fn build(&mut self) {
        assert!(!self.is_closed, "build() on a closed graph!");

        build::build_pass_resource_properties(self);
        build::allocate_pass_resources(self);

        glog::trace!("Built render graph with {} passes", self.pass_build.len());
        self.is_closed = true;
    }

    /// Record and submit the built frame. Pass order is preserved no matter
    /// which execution mode runs.
    pub fn execute(&mut self, flags: RenderGraphExecutionFlags) {
        assert!(self.is_closed, "execute() before build()!");

        if flags.contains(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED) {
            execute::execute_single_threaded(self);
        } else {
            execute::execute_parallel(self);
        }
    }

    /// Destroy per-frame device objects. Pinned resources survive unless
    /// `destroy_pinned` is set (graph teardown).
    fn destroy_frame_resources(&mut self, destroy_pinned: bool) {
        let device = self.device.as_ref();

        let mut i = 0;
        while i < self.texture_2d_handles.len() {
            let handle = self.texture_2d_handles[i];
            let (run, build) = self.texture_2ds.get_hot_cold_mut(handle);

            let pinned = build.resource_flags.contains(ResourceFlags::PINNED);
            let keep = pinned && !destroy_pinned;

            if build.ownership == ResourceOwnership::Internal && !keep {
                if run.rhi_texture.is_valid() {
                    device.destroy_texture_2d(run.rhi_texture);
                    run.rhi_texture = heron_rhi::Texture2D::INVALID;
                }
                if run.view.is_valid() {
                    device.destroy_texture_2d_view(run.view);
                    run.view = heron_rhi::Texture2DView::INVALID;
                }
                for rw_view in run.rw_views.iter_mut() {
                    if rw_view.is_valid() {
                        device.destroy_rw_texture_2d_view(*rw_view);
                        *rw_view = heron_rhi::RWTexture2DView::INVALID;
                    }
                }
                if run.rtv.is_valid() {
                    device.destroy_render_target_view(run.rtv);
                    run.rtv = heron_rhi::RenderTargetView::INVALID;
                }
                if run.dsv.is_valid() {
                    device.destroy_depth_stencil_view(run.dsv);
                    run.dsv = heron_rhi::DepthStencilView::INVALID;
                }
                if run.pinned_allocation.is_valid() {
                    device.gpu_free(run.pinned_allocation);
                    run.pinned_allocation = heron_rhi::GpuAllocation::INVALID;
                }
            }

            run.resource_access_mask.clear();
            run.view_access_mask.clear();
            run.rw_view_access_mask.clear();

            if keep {
                build.first_used_pass = INVALID_PASS_INDEX;
                build.last_used_pass = INVALID_PASS_INDEX;
                build.barrier.barrier_last_updated = INVALID_PASS_INDEX;
                i += 1;
            } else {
                self.texture_2ds.remove(handle);
                self.texture_2d_handles.swap_remove(i);
            }
        }

        let mut i = 0;
        while i < self.texture_3d_handles.len() {
            let handle = self.texture_3d_handles[i];
            let (run, build) = self.texture_3ds.get_hot_cold_mut(handle);

            let pinned = build.resource_flags.contains(ResourceFlags::PINNED);
            let keep = pinned && !destroy_pinned;

            if build.ownership == ResourceOwnership::Internal && !keep {
                if run.rhi_texture.is_valid() {
                    device.destroy_texture_3d(run.rhi_texture);
                    run.rhi_texture = heron_rhi::Texture3D::INVALID;
                }
                if run.view.is_valid() {
                    device.destroy_texture_3d_view(run.view);
                    run.view = heron_rhi::Texture3DView::INVALID;
                }
                for rw_view in run.rw_views.iter_mut() {
                    if rw_view.is_valid() {
                        device.destroy_rw_texture_3d_view(*rw_view);
                        *rw_view = heron_rhi::RWTexture3DView::INVALID;
                    }
                }
                if run.pinned_allocation.is_valid() {
                    device.gpu_free(run.pinned_allocation);
                    run.pinned_allocation = heron_rhi::GpuAllocation::INVALID;
                }
            }

            run.resource_access_mask.clear();
            run.view_access_mask.clear();
            run.rw_view_access_mask.clear();

            if keep {
                build.first_used_pass = INVALID_PASS_INDEX;
                build.last_used_pass = INVALID_PASS_INDEX;
                build.barrier.barrier_last_updated = INVALID_PASS_INDEX;
                i += 1;
            } else {
                self.texture_3ds.remove(handle);
                self.texture_3d_handles.swap_remove(i);
            }
        }

        let mut i = 0;
        while i < self.buffer_handles.len() {
            let handle = self.buffer_handles[i];
            let (run, build) = self.buffers.get_hot_cold_mut(handle);

            let pinned = build.resource_flags.contains(ResourceFlags::PINNED);
            let keep = pinned && !destroy_pinned;

            if build.ownership == ResourceOwnership::Internal && !keep {
                if run.buffer.buffer.is_valid() {
                    device.destroy_buffer(run.buffer.buffer);
                    run.buffer = BufferRegion::default();
                }
                if run.view.is_valid() {
                    device.destroy_buffer_view(run.view);
                    run.view = heron_rhi::BufferView::INVALID;
                }
                if run.typed_view.is_valid() {
                    device.destroy_typed_buffer_view(run.typed_view);
                    run.typed_view = heron_rhi::TypedBufferView::INVALID;
                }
                if run.uniform_view.is_valid() {
                    device.destroy_uniform_buffer_view(run.uniform_view);
                    run.uniform_view = heron_rhi::UniformBufferView::INVALID;
                }
                if run.rw_view.is_valid() {
                    device.destroy_rw_buffer_view(run.rw_view);
                    run.rw_view = heron_rhi::RWBufferView::INVALID;
                }
                if run.pinned_allocation.is_valid() {
                    device.gpu_free(run.pinned_allocation);
                    run.pinned_allocation = heron_rhi::GpuAllocation::INVALID;
                }
            }

            run.resource_access_mask.clear();
            run.view_access_mask.clear();
            run.typed_view_access_mask.clear();
            run.uniform_view_access_mask.clear();
            run.rw_view_access_mask.clear();

            if keep {
                build.first_used_pass = INVALID_PASS_INDEX;
                build.last_used_pass = INVALID_PASS_INDEX;
                build.barrier.barrier_last_updated = INVALID_PASS_INDEX;
                i += 1;
            } else {
                self.buffers.remove(handle);
                self.buffer_handles.swap_remove(i);
            }
        }
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        self.destroy_frame_resources(true);
    }
}
