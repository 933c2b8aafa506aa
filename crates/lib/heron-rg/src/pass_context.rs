use arrayvec::ArrayVec;

use heron_rhi::{
    BufferView, BufferViewDesc, CommandList, Device, TypedBufferView, UniformBufferView,
    UniformBufferViewDesc, Viewport,
};

use crate::graph_resource::RenderGraphResources;
use crate::resource::{Buffer, BufferRegion, Texture2D, Texture3D};

pub const MAX_TEMP_BUFFER_COUNT: usize = 256;

const TEMP_BUFFER_ALIGN: u32 = 256;

/// Handed to every pass callback; the only way to get from graph handles to
/// device objects.
///
/// Every resolve asserts that the pass declared the matching access kind in
/// its usage lists. Temporary buffer views created through the context are
/// destroyed when the context goes out of scope at the end of the pass.
pub struct PassExecutionContext<'a> {
    device: &'a dyn Device,
    command_list: &'a mut dyn CommandList,

    viewport: Viewport,
    resources: &'a RenderGraphResources<'a>,
    pass_idx: u32,

    temp_buffer_views: ArrayVec<BufferView, MAX_TEMP_BUFFER_COUNT>,
    temp_uniform_buffer_views: ArrayVec<UniformBufferView, MAX_TEMP_BUFFER_COUNT>,
}

impl<'a> PassExecutionContext<'a> {
    pub(crate) fn new(
        device: &'a dyn Device,
        command_list: &'a mut dyn CommandList,
        viewport: Viewport,
        resources: &'a RenderGraphResources<'a>,
        pass_idx: u32,
    ) -> Self {
        Self {
            device,
            command_list,
            viewport,
            resources,
            pass_idx,
            temp_buffer_views: ArrayVec::new(),
            temp_uniform_buffer_views: ArrayVec::new(),
        }
    }

    #[inline]
    pub fn command_list(&mut self) -> &mut dyn CommandList {
        self.command_list
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn resolve_buffer(&self, buffer: Buffer) -> BufferRegion {
        let run = self.resources.buffers.get_hot(buffer);
        assert!(
            run.resource_access_mask.test(self.pass_idx),
            "Pass {} did not declare raw access to {:?}!",
            self.pass_idx,
            buffer
        );

        run.buffer
    }

    pub fn resolve_buffer_view(&self, buffer: Buffer) -> BufferView {
        let run = self.resources.buffers.get_hot(buffer);
        assert!(
            run.view_access_mask.test(self.pass_idx),
            "Pass {} did not declare shader-read access to {:?}!",
            self.pass_idx,
            buffer
        );

        run.view
    }

    pub fn resolve_typed_buffer_view(&self, buffer: Buffer) -> TypedBufferView {
        let run = self.resources.buffers.get_hot(buffer);
        assert!(
            run.typed_view_access_mask.test(self.pass_idx),
            "Pass {} did not declare typed shader-read access to {:?}!",
            self.pass_idx,
            buffer
        );

        run.typed_view
    }

    pub fn resolve_uniform_buffer_view(&self, buffer: Buffer) -> UniformBufferView {
        let run = self.resources.buffers.get_hot(buffer);
        assert!(
            run.uniform_view_access_mask.test(self.pass_idx),
            "Pass {} did not declare uniform access to {:?}!",
            self.pass_idx,
            buffer
        );

        run.uniform_view
    }

    pub fn resolve_rw_buffer_view(&self, buffer: Buffer) -> heron_rhi::RWBufferView {
        let run = self.resources.buffers.get_hot(buffer);
        assert!(
            run.rw_view_access_mask.test(self.pass_idx),
            "Pass {} did not declare read-write access to {:?}!",
            self.pass_idx,
            buffer
        );

        run.rw_view
    }

    pub fn resolve_texture_2d(&self, texture: Texture2D) -> heron_rhi::Texture2D {
        let run = self.resources.texture_2ds.get_hot(texture);
        assert!(
            run.resource_access_mask.test(self.pass_idx),
            "Pass {} did not declare raw access to {:?}!",
            self.pass_idx,
            texture
        );

        run.rhi_texture
    }

    pub fn resolve_texture_2d_view(&self, texture: Texture2D) -> heron_rhi::Texture2DView {
        let run = self.resources.texture_2ds.get_hot(texture);
        assert!(
            run.view_access_mask.test(self.pass_idx),
            "Pass {} did not declare shader-read access to {:?}!",
            self.pass_idx,
            texture
        );

        run.view
    }

    pub fn resolve_rw_texture_2d_view(
        &self,
        texture: Texture2D,
        mip_idx: u32,
    ) -> heron_rhi::RWTexture2DView {
        let run = self.resources.texture_2ds.get_hot(texture);
        assert!(
            run.rw_view_access_mask.test(self.pass_idx),
            "Pass {} did not declare read-write access to {:?}!",
            self.pass_idx,
            texture
        );

        run.rw_views[mip_idx as usize]
    }

    pub fn resolve_texture_3d(&self, texture: Texture3D) -> heron_rhi::Texture3D {
        let run = self.resources.texture_3ds.get_hot(texture);
        assert!(
            run.resource_access_mask.test(self.pass_idx),
            "Pass {} did not declare raw access to {:?}!",
            self.pass_idx,
            texture
        );

        run.rhi_texture
    }

    pub fn resolve_texture_3d_view(&self, texture: Texture3D) -> heron_rhi::Texture3DView {
        let run = self.resources.texture_3ds.get_hot(texture);
        assert!(
            run.view_access_mask.test(self.pass_idx),
            "Pass {} did not declare shader-read access to {:?}!",
            self.pass_idx,
            texture
        );

        run.view
    }

    pub fn resolve_rw_texture_3d_view(
        &self,
        texture: Texture3D,
        mip_idx: u32,
    ) -> heron_rhi::RWTexture3DView {
        let run = self.resources.texture_3ds.get_hot(texture);
        assert!(
            run.rw_view_access_mask.test(self.pass_idx),
            "Pass {} did not declare read-write access to {:?}!",
            self.pass_idx,
            texture
        );

        run.rw_views[mip_idx as usize]
    }

    /// Upload `data` into command-list scratch and view it as a raw buffer.
    /// The view lives until the end of the pass.
    pub fn allocate_temporary_buffer_view(&mut self, data: &[u8]) -> BufferView {
        assert!(
            self.temp_buffer_views.len() < MAX_TEMP_BUFFER_COUNT,
            "Pass {} exceeded {} temporary buffer views!",
            self.pass_idx,
            MAX_TEMP_BUFFER_COUNT
        );

        let temp = self
            .command_list
            .allocate_temporary_resource(data.len() as u32, TEMP_BUFFER_ALIGN);
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), temp.cpu_ptr, data.len());
        }

        let view = self.device.create_buffer_view(&BufferViewDesc {
            buffer: temp.buffer,
            offset_in_bytes: temp.offset_in_bytes,
            size_in_bytes: temp.size_in_bytes,
        });

        self.temp_buffer_views.push(view);
        view
    }

    /// Upload `data` into command-list scratch and view it as a uniform
    /// buffer. The view lives until the end of the pass.
    pub fn allocate_temporary_uniform_buffer_view(&mut self, data: &[u8]) -> UniformBufferView {
        assert!(
            self.temp_uniform_buffer_views.len() < MAX_TEMP_BUFFER_COUNT,
            "Pass {} exceeded {} temporary uniform buffer views!",
            self.pass_idx,
            MAX_TEMP_BUFFER_COUNT
        );

        let temp = self
            .command_list
            .allocate_temporary_resource(data.len() as u32, TEMP_BUFFER_ALIGN);
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), temp.cpu_ptr, data.len());
        }

        let view = self.device.create_uniform_buffer_view(&UniformBufferViewDesc {
            buffer: temp.buffer,
            offset_in_bytes: temp.offset_in_bytes,
            size_in_bytes: temp.size_in_bytes,
        });

        self.temp_uniform_buffer_views.push(view);
        view
    }
}

impl<'a> Drop for PassExecutionContext<'a> {
    fn drop(&mut self) {
        for view in self.temp_buffer_views.drain(..) {
            self.device.destroy_buffer_view(view);
        }
        for view in self.temp_uniform_buffer_views.drain(..) {
            self.device.destroy_uniform_buffer_view(view);
        }
    }
}
