//! The two single-threaded build sweeps that close a declared frame:
//! first infer creation flags, lifetimes and adaptive sizes, then create
//! device resources and views on first use, track barrier state, and emit
//! the per-pass barrier lists.

use heron_container::Handle;
use heron_rhi::{
    BufferBarrier, Device, GpuAllocationFlags, GpuMemoryRegion, PipelineAccess,
    PipelineSyncStage, Texture2DBarrier, Texture3DBarrier, TextureLayout,
    TransientMemoryAllocator, Viewport,
};

use crate::graph::RenderGraph;
use crate::graph_resource::*;
use crate::pass::RenderPassFlags;
use crate::resource::*;

use heron_container::ScratchSlice;

/// Build step 1: walk every usage record of every pass in order and update
/// the properties resource creation needs: combined creation flags, first
/// and last used pass, and resolved dimensions of adaptive textures.
///
/// Only cold data is touched; no device objects exist yet.
pub(crate) fn build_pass_resource_properties(graph: &mut RenderGraph) {
    let RenderGraph {
        texture_2ds,
        texture_3ds,
        buffers,
        pass_build,
        pass_execution,
        ..
    } = graph;

    for (pass_idx, (pass, execution)) in
        pass_build.iter().zip(pass_execution.iter()).enumerate()
    {
        let pass_idx = pass_idx as u32;
        let viewport = execution.viewport;

        for attachment in unsafe { pass.color_attachments.as_slice() } {
            let texture = texture_2ds.get_cold_mut(attachment.texture);
            texture.creation_flags |= heron_rhi::TextureCreationFlags::ALLOW_RENDER_TARGET;
            touch_texture_2d(texture, &viewport, pass_idx);
        }

        if pass.depth_attachment.texture.is_valid() {
            let texture = texture_2ds.get_cold_mut(pass.depth_attachment.texture);
            texture.creation_flags |=
                heron_rhi::TextureCreationFlags::ALLOW_DEPTH_STENCIL_TARGET;
            touch_texture_2d(texture, &viewport, pass_idx);
        }

        for usage in unsafe { pass.texture_2ds.as_slice() } {
            let texture = texture_2ds.get_cold_mut(usage.texture);
            touch_texture_2d(texture, &viewport, pass_idx);

            match usage.access {
                TextureAccess::ShaderReadOnly => {
                    assert_readable_2d(texture, pass_idx, pass.name);
                    texture.creation_flags |=
                        heron_rhi::TextureCreationFlags::ALLOW_SHADER_READ_ONLY;
                }
                TextureAccess::ShaderReadWrite => {
                    texture.creation_flags |=
                        heron_rhi::TextureCreationFlags::ALLOW_SHADER_READ_WRITE;
                    texture.rw_view_mip_bitmask |= 1 << usage.mip_index;
                }
                TextureAccess::CopySource => {
                    assert_readable_2d(texture, pass_idx, pass.name);
                }
                TextureAccess::CopyDest | TextureAccess::Presentation => {}
            }
        }

        for usage in unsafe { pass.texture_3ds.as_slice() } {
            let texture = texture_3ds.get_cold_mut(usage.texture);
            texture.last_used_pass = pass_idx;
            if texture.first_used_pass == INVALID_PASS_INDEX {
                texture.first_used_pass = pass_idx;
            }

            match usage.access {
                TextureAccess::ShaderReadOnly => {
                    assert_readable_3d(texture, pass_idx, pass.name);
                    texture.creation_flags |=
                        heron_rhi::TextureCreationFlags::ALLOW_SHADER_READ_ONLY;
                }
                TextureAccess::ShaderReadWrite => {
                    texture.creation_flags |=
                        heron_rhi::TextureCreationFlags::ALLOW_SHADER_READ_WRITE;
                    texture.rw_view_mip_bitmask |= 1 << usage.mip_index;
                }
                TextureAccess::CopySource => {
                    assert_readable_3d(texture, pass_idx, pass.name);
                }
                TextureAccess::CopyDest => {}
                TextureAccess::Presentation => {
                    panic!("Presented a 3D texture in pass '{}'!", pass.name)
                }
            }
        }

        for usage in unsafe { pass.buffers.as_slice() } {
            let buffer = buffers.get_cold_mut(usage.buffer);
            buffer.last_used_pass = pass_idx;
            if buffer.first_used_pass == INVALID_PASS_INDEX {
                buffer.first_used_pass = pass_idx;
            }

            match usage.access {
                BufferAccess::ShaderReadOnly => {
                    assert_readable_buffer(buffer, pass_idx, pass.name);
                    buffer.creation_flags |=
                        heron_rhi::BufferCreationFlags::ALLOW_SHADER_READ_ONLY;
                }
                BufferAccess::ShaderReadWrite => {
                    buffer.creation_flags |=
                        heron_rhi::BufferCreationFlags::ALLOW_SHADER_READ_WRITE;
                }
                BufferAccess::UniformBuffer => {
                    assert_readable_buffer(buffer, pass_idx, pass.name);
                    buffer.creation_flags |=
                        heron_rhi::BufferCreationFlags::ALLOW_UNIFORM_BUFFER;
                }
                BufferAccess::CopySource
                | BufferAccess::DrawIdBuffer
                | BufferAccess::IndexBuffer
                | BufferAccess::ArgumentBuffer => {
                    assert_readable_buffer(buffer, pass_idx, pass.name);
                }
                BufferAccess::CopyDest => {}
            }
        }
    }
}

fn touch_texture_2d(texture: &mut Texture2DBuildData, viewport: &Viewport, pass_idx: u32) {
    texture.last_used_pass = pass_idx;
    if texture.first_used_pass == INVALID_PASS_INDEX {
        texture.first_used_pass = pass_idx;

        // Adaptive sizes resolve against the viewport of the first pass
        // that sees the texture.
        if texture.ownership == ResourceOwnership::Internal
            && texture.desc.size_mode == TextureSizeMode::Adaptive
        {
            texture.desc.width = (viewport.width / texture.desc.width).max(1);
            texture.desc.height = (viewport.height / texture.desc.height).max(1);
        }
    }
}

// Nothing can have written an internal resource before its first-use pass.
fn assert_readable_2d(texture: &Texture2DBuildData, pass_idx: u32, pass_name: &str) {
    assert!(
        texture.ownership == ResourceOwnership::External
            || texture.first_used_pass != pass_idx,
        "Pass '{}' reads texture '{}' at its first use, nothing has written it yet!",
        pass_name,
        texture.desc.name
    );
}

fn assert_readable_3d(texture: &Texture3DBuildData, pass_idx: u32, pass_name: &str) {
    assert!(
        texture.ownership == ResourceOwnership::External
            || texture.first_used_pass != pass_idx,
        "Pass '{}' reads texture '{}' at its first use, nothing has written it yet!",
        pass_name,
        texture.desc.name
    );
}

fn assert_readable_buffer(buffer: &BufferBuildData, pass_idx: u32, pass_name: &str) {
    assert!(
        buffer.ownership == ResourceOwnership::External
            || buffer.first_used_pass != pass_idx,
        "Pass '{}' reads buffer '{}' at its first use, nothing has written it yet!",
        pass_name,
        buffer.desc.name
    );
}

/// Build step 2: walk the passes again, this time creating device resources
/// and views on first use, folding each usage into the resource's barrier
/// state, releasing transient memory after each resource's final pass, and
/// emitting the per-pass barrier lists.
pub(crate) fn allocate_pass_resources(graph: &mut RenderGraph) {
    let RenderGraph {
        device,
        texture_2ds,
        texture_3ds,
        buffers,
        pass_build,
        pass_execution,
        scratch,
        resource_allocator,
        ..
    } = graph;
    let device = device.as_ref();

    for pass_idx in 0..pass_build.len() {
        let pass = &pass_build[pass_idx];
        let pass_idx = pass_idx as u32;

        let mut used_2d_textures: Vec<Texture2D> = Vec::new();
        let mut used_3d_textures: Vec<Texture3D> = Vec::new();
        let mut used_buffers: Vec<Buffer> = Vec::new();

        // Color attachments
        let color_attachments = unsafe { pass.color_attachments.as_slice() };
        let render_targets = scratch.alloc_uninit::<heron_rhi::RenderPassRenderTarget>(
            color_attachments.len(),
        );

        for (render_target_slot, attachment) in color_attachments.iter().enumerate() {
            let (run, build) = texture_2ds.get_hot_cold_mut(attachment.texture);
            if build.first_used_pass == pass_idx {
                build_texture_2d(device, resource_allocator, build, run);
            }

            if !run.rtv.is_valid() {
                assert!(
                    build.ownership == ResourceOwnership::Internal,
                    "Registered texture '{}' has no render target view!",
                    build.desc.name
                );
                run.rtv = device.create_render_target_view(&heron_rhi::RenderTargetViewDesc {
                    texture: run.rhi_texture,
                    format: build.desc.render_format,
                });
            }

            update_texture_barrier_data(&mut build.barrier, pass_idx, false);
            render_target_sync_properties(&mut build.barrier);
            push_unique(&mut used_2d_textures, attachment.texture);

            unsafe {
                render_targets.as_ptr().add(render_target_slot).write(
                    heron_rhi::RenderPassRenderTarget {
                        view: run.rtv,
                        load_op: attachment.load_op,
                        clear_value: run.clear_value,
                    },
                );
            }
        }
        pass_execution[pass_idx as usize].render_targets =
            ScratchSlice::new(render_targets, color_attachments.len());

        // Depth attachment
        if pass.depth_attachment.texture.is_valid() {
            let (run, build) = texture_2ds.get_hot_cold_mut(pass.depth_attachment.texture);
            if build.first_used_pass == pass_idx {
                build_texture_2d(device, resource_allocator, build, run);
            }

            if !run.dsv.is_valid() {
                assert!(
                    build.ownership == ResourceOwnership::Internal,
                    "Registered texture '{}' has no depth stencil view!",
                    build.desc.name
                );
                run.dsv = device.create_depth_stencil_view(&heron_rhi::DepthStencilViewDesc {
                    texture: run.rhi_texture,
                    format: build.desc.depth_format,
                });
            }

            update_texture_barrier_data(&mut build.barrier, pass_idx, false);
            depth_target_sync_properties(pass.flags, &mut build.barrier);
            push_unique(&mut used_2d_textures, pass.depth_attachment.texture);

            pass_execution[pass_idx as usize].depth_target = heron_rhi::RenderPassDepthTarget {
                view: run.dsv,
                load_op: pass.depth_attachment.load_op,
                clear_value: run.clear_value,
            };
        }

        // 2D texture resources
        for usage in unsafe { pass.texture_2ds.as_slice() } {
            let (run, build) = texture_2ds.get_hot_cold_mut(usage.texture);
            if build.first_used_pass == pass_idx {
                build_texture_2d(device, resource_allocator, build, run);
            }

            let mut requires_read_write_barrier = false;
            match usage.access {
                TextureAccess::ShaderReadOnly => {
                    if !run.view.is_valid() {
                        assert!(
                            build.ownership == ResourceOwnership::Internal,
                            "Registered texture '{}' has no shader read view!",
                            build.desc.name
                        );
                        run.view = device.create_texture_2d_view(&heron_rhi::Texture2DViewDesc {
                            texture: run.rhi_texture,
                            format: build.desc.format,
                            mip_count: build.desc.mip_levels,
                        });
                    }
                    run.view_access_mask.set(pass_idx);
                }
                TextureAccess::ShaderReadWrite => {
                    for mip in 0..MAX_RW_VIEWS {
                        if build.rw_view_mip_bitmask & (1 << mip) != 0
                            && !run.rw_views[mip].is_valid()
                        {
                            assert!(
                                build.ownership == ResourceOwnership::Internal,
                                "Registered texture '{}' has no read-write view for mip {}!",
                                build.desc.name,
                                mip
                            );
                            run.rw_views[mip] =
                                device.create_rw_texture_2d_view(&heron_rhi::RWTexture2DViewDesc {
                                    texture: run.rhi_texture,
                                    format: build.desc.format,
                                    mip_index: mip as u32,
                                });
                        }
                    }
                    run.rw_view_access_mask.set(pass_idx);
                    requires_read_write_barrier = usage
                        .rw_flags
                        .contains(ResourceReadWriteFlags::SYNC_BEFORE_READ_WRITE_ACCESS);
                }
                TextureAccess::CopySource | TextureAccess::CopyDest => {
                    run.resource_access_mask.set(pass_idx);
                }
                TextureAccess::Presentation => {}
            }

            update_texture_barrier_data(&mut build.barrier, pass_idx, requires_read_write_barrier);
            texture_sync_properties(usage.access, pass.flags, &mut build.barrier, build.desc.name);
            push_unique(&mut used_2d_textures, usage.texture);
        }

        // 3D texture resources
        for usage in unsafe { pass.texture_3ds.as_slice() } {
            let (run, build) = texture_3ds.get_hot_cold_mut(usage.texture);
            if build.first_used_pass == pass_idx {
                build_texture_3d(device, resource_allocator, build, run);
            }

            let mut requires_read_write_barrier = false;
            match usage.access {
                TextureAccess::ShaderReadOnly => {
                    if !run.view.is_valid() {
                        assert!(
                            build.ownership == ResourceOwnership::Internal,
                            "Registered texture '{}' has no shader read view!",
                            build.desc.name
                        );
                        run.view = device.create_texture_3d_view(&heron_rhi::Texture3DViewDesc {
                            texture: run.rhi_texture,
                            format: build.desc.format,
                            mip_count: build.desc.mip_levels,
                        });
                    }
                    run.view_access_mask.set(pass_idx);
                }
                TextureAccess::ShaderReadWrite => {
                    for mip in 0..MAX_RW_VIEWS {
                        if build.rw_view_mip_bitmask & (1 << mip) != 0
                            && !run.rw_views[mip].is_valid()
                        {
                            assert!(
                                build.ownership == ResourceOwnership::Internal,
                                "Registered texture '{}' has no read-write view for mip {}!",
                                build.desc.name,
                                mip
                            );
                            run.rw_views[mip] =
                                device.create_rw_texture_3d_view(&heron_rhi::RWTexture3DViewDesc {
                                    texture: run.rhi_texture,
                                    format: build.desc.format,
                                    mip_index: mip as u32,
                                });
                        }
                    }
                    run.rw_view_access_mask.set(pass_idx);
                    requires_read_write_barrier = usage
                        .rw_flags
                        .contains(ResourceReadWriteFlags::SYNC_BEFORE_READ_WRITE_ACCESS);
                }
                TextureAccess::CopySource | TextureAccess::CopyDest => {
                    run.resource_access_mask.set(pass_idx);
                }
                TextureAccess::Presentation => unreachable!(),
            }

            update_texture_barrier_data(&mut build.barrier, pass_idx, requires_read_write_barrier);
            texture_sync_properties(usage.access, pass.flags, &mut build.barrier, build.desc.name);
            push_unique(&mut used_3d_textures, usage.texture);
        }

        // Buffer resources
        for usage in unsafe { pass.buffers.as_slice() } {
            let (run, build) = buffers.get_hot_cold_mut(usage.buffer);
            if build.first_used_pass == pass_idx {
                build_buffer(device, resource_allocator, build, run);
            }

            let mut requires_read_write_barrier = false;
            match usage.access {
                BufferAccess::ShaderReadOnly => {
                    if usage.structure_size_in_bytes > 0 {
                        if !run.typed_view.is_valid() {
                            assert!(
                                build.ownership == ResourceOwnership::Internal,
                                "Registered buffer '{}' has no typed view!",
                                build.desc.name
                            );
                            run.typed_view =
                                device.create_typed_buffer_view(&heron_rhi::TypedBufferViewDesc {
                                    buffer: run.buffer.buffer,
                                    offset_in_bytes: run.buffer.offset,
                                    element_size_in_bytes: usage.structure_size_in_bytes,
                                    element_count: build.desc.size_in_bytes
                                        / usage.structure_size_in_bytes,
                                });
                        }
                        run.typed_view_access_mask.set(pass_idx);
                    } else {
                        if !run.view.is_valid() {
                            assert!(
                                build.ownership == ResourceOwnership::Internal,
                                "Registered buffer '{}' has no raw view!",
                                build.desc.name
                            );
                            run.view = device.create_buffer_view(&heron_rhi::BufferViewDesc {
                                buffer: run.buffer.buffer,
                                offset_in_bytes: run.buffer.offset,
                                size_in_bytes: build.desc.size_in_bytes,
                            });
                        }
                        run.view_access_mask.set(pass_idx);
                    }
                }
                BufferAccess::ShaderReadWrite => {
                    if !run.rw_view.is_valid() {
                        assert!(
                            build.ownership == ResourceOwnership::Internal,
                            "Registered buffer '{}' has no read-write view!",
                            build.desc.name
                        );
                        run.rw_view = device.create_rw_buffer_view(&heron_rhi::RWBufferViewDesc {
                            buffer: run.buffer.buffer,
                            offset_in_bytes: run.buffer.offset,
                            size_in_bytes: build.desc.size_in_bytes,
                        });
                    }
                    run.rw_view_access_mask.set(pass_idx);
                    requires_read_write_barrier = usage
                        .rw_flags
                        .contains(ResourceReadWriteFlags::SYNC_BEFORE_READ_WRITE_ACCESS);
                }
                BufferAccess::UniformBuffer => {
                    if !run.uniform_view.is_valid() {
                        assert!(
                            build.ownership == ResourceOwnership::Internal,
                            "Registered buffer '{}' has no uniform view!",
                            build.desc.name
                        );
                        run.uniform_view =
                            device.create_uniform_buffer_view(&heron_rhi::UniformBufferViewDesc {
                                buffer: run.buffer.buffer,
                                offset_in_bytes: run.buffer.offset,
                                size_in_bytes: build.desc.size_in_bytes,
                            });
                    }
                    run.uniform_view_access_mask.set(pass_idx);
                }
                BufferAccess::CopySource
                | BufferAccess::CopyDest
                | BufferAccess::DrawIdBuffer
                | BufferAccess::IndexBuffer
                | BufferAccess::ArgumentBuffer => {
                    run.resource_access_mask.set(pass_idx);
                }
            }

            update_buffer_barrier_data(&mut build.barrier, pass_idx, requires_read_write_barrier);
            buffer_sync_properties(usage.access, pass.flags, &mut build.barrier);
            push_unique(&mut used_buffers, usage.buffer);
        }

        // Barrier emission, plus transient memory release for every resource
        // whose final pass this is.
        let texture_2d_barriers = scratch.alloc_uninit::<Texture2DBarrier>(used_2d_textures.len());
        let mut texture_2d_barrier_count = 0;
        for texture in &used_2d_textures {
            let (run, build) = texture_2ds.get_hot_cold_mut(*texture);

            if build.last_used_pass == pass_idx && build.gpu_region.allocation.is_valid() {
                resource_allocator.free_memory_region(&build.gpu_region);
                build.gpu_region = GpuMemoryRegion::default();
            }

            let state = &build.barrier;
            if state.prev_sync_stage != state.curr_sync_stage
                || state.prev_access != state.curr_access
                || state.prev_layout != state.curr_layout
                || state.requires_read_write_barrier
            {
                unsafe {
                    texture_2d_barriers.as_ptr().add(texture_2d_barrier_count).write(
                        Texture2DBarrier {
                            from_stage: state.prev_sync_stage,
                            to_stage: state.curr_sync_stage,
                            from_access: state.prev_access,
                            to_access: state.curr_access,
                            from_layout: state.prev_layout,
                            to_layout: state.curr_layout,
                            handle: run.rhi_texture,
                            first_mip_level: 0,
                            num_mips: build.desc.mip_levels,
                            first_array_slice: 0,
                            num_array_slices: 1,
                        },
                    );
                }
                texture_2d_barrier_count += 1;
            }
        }
        pass_execution[pass_idx as usize].texture_2d_barriers =
            ScratchSlice::new(texture_2d_barriers, texture_2d_barrier_count);

        let texture_3d_barriers = scratch.alloc_uninit::<Texture3DBarrier>(used_3d_textures.len());
        let mut texture_3d_barrier_count = 0;
        for texture in &used_3d_textures {
            let (run, build) = texture_3ds.get_hot_cold_mut(*texture);

            if build.last_used_pass == pass_idx && build.gpu_region.allocation.is_valid() {
                resource_allocator.free_memory_region(&build.gpu_region);
                build.gpu_region = GpuMemoryRegion::default();
            }

            let state = &build.barrier;
            if state.prev_sync_stage != state.curr_sync_stage
                || state.prev_access != state.curr_access
                || state.prev_layout != state.curr_layout
                || state.requires_read_write_barrier
            {
                unsafe {
                    texture_3d_barriers.as_ptr().add(texture_3d_barrier_count).write(
                        Texture3DBarrier {
                            from_stage: state.prev_sync_stage,
                            to_stage: state.curr_sync_stage,
                            from_access: state.prev_access,
                            to_access: state.curr_access,
                            from_layout: state.prev_layout,
                            to_layout: state.curr_layout,
                            handle: run.rhi_texture,
                            first_mip_level: 0,
                            num_mips: build.desc.mip_levels,
                        },
                    );
                }
                texture_3d_barrier_count += 1;
            }
        }
        pass_execution[pass_idx as usize].texture_3d_barriers =
            ScratchSlice::new(texture_3d_barriers, texture_3d_barrier_count);

        let buffer_barriers = scratch.alloc_uninit::<BufferBarrier>(used_buffers.len());
        let mut buffer_barrier_count = 0;
        for buffer in &used_buffers {
            let (run, build) = buffers.get_hot_cold_mut(*buffer);

            if build.last_used_pass == pass_idx && build.gpu_region.allocation.is_valid() {
                resource_allocator.free_memory_region(&build.gpu_region);
                build.gpu_region = GpuMemoryRegion::default();
            }

            let state = &build.barrier;
            if state.prev_sync_stage != state.curr_sync_stage
                || state.prev_access != state.curr_access
                || state.requires_read_write_barrier
            {
                unsafe {
                    buffer_barriers.as_ptr().add(buffer_barrier_count).write(BufferBarrier {
                        from_stage: state.prev_sync_stage,
                        to_stage: state.curr_sync_stage,
                        from_access: state.prev_access,
                        to_access: state.curr_access,
                        handle: run.buffer.buffer,
                        offset: run.buffer.offset,
                        size: build.desc.size_in_bytes,
                    });
                }
                buffer_barrier_count += 1;
            }
        }
        pass_execution[pass_idx as usize].buffer_barriers =
            ScratchSlice::new(buffer_barriers, buffer_barrier_count);
    }
}

fn push_unique<T: PartialEq + Copy>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn build_texture_2d(
    device: &dyn Device,
    resource_allocator: &mut TransientMemoryAllocator,
    build: &mut Texture2DBuildData,
    run: &mut Texture2DRunData,
) {
    if build.ownership == ResourceOwnership::External {
        return;
    }

    let pinned = build.resource_flags.contains(ResourceFlags::PINNED);
    assert!(!run.rhi_texture.is_valid() || pinned);

    if pinned && run.rhi_texture.is_valid() {
        return;
    }

    let desc = heron_rhi::Texture2DDesc {
        flags: build.creation_flags,
        width: build.desc.width,
        height: build.desc.height,
        array_size: 1,
        mip_levels: build.desc.mip_levels,
        format: build.desc.format,
        opt_clear_value: Some(build.desc.clear_value),
        name: build.desc.name,
    };

    let footprint = device.calculate_texture_2d_footprint(&desc);
    let region = if pinned {
        run.pinned_allocation =
            device.gpu_alloc(footprint.size_in_bytes, GpuAllocationFlags::DEVICE_ONLY);
        GpuMemoryRegion {
            allocation: run.pinned_allocation,
            offset_in_allocation: 0,
            region_size: footprint.size_in_bytes,
        }
    } else {
        resource_allocator.allocate_memory_region(footprint.size_in_bytes)
    };

    run.rhi_texture = device.create_texture_2d(&desc, &region);
    build.gpu_region = region;
}

fn build_texture_3d(
    device: &dyn Device,
    resource_allocator: &mut TransientMemoryAllocator,
    build: &mut Texture3DBuildData,
    run: &mut Texture3DRunData,
) {
    if build.ownership == ResourceOwnership::External {
        return;
    }

    let pinned = build.resource_flags.contains(ResourceFlags::PINNED);
    assert!(!run.rhi_texture.is_valid() || pinned);

    if pinned && run.rhi_texture.is_valid() {
        return;
    }

    let desc = heron_rhi::Texture3DDesc {
        flags: build.creation_flags,
        width: build.desc.width,
        height: build.desc.height,
        depth: build.desc.depth,
        mip_levels: build.desc.mip_levels,
        format: build.desc.format,
        opt_clear_value: None,
        name: build.desc.name,
    };

    let footprint = device.calculate_texture_3d_footprint(&desc);
    let region = if pinned {
        run.pinned_allocation =
            device.gpu_alloc(footprint.size_in_bytes, GpuAllocationFlags::DEVICE_ONLY);
        GpuMemoryRegion {
            allocation: run.pinned_allocation,
            offset_in_allocation: 0,
            region_size: footprint.size_in_bytes,
        }
    } else {
        resource_allocator.allocate_memory_region(footprint.size_in_bytes)
    };

    run.rhi_texture = device.create_texture_3d(&desc, &region);
    build.gpu_region = region;
}

fn build_buffer(
    device: &dyn Device,
    resource_allocator: &mut TransientMemoryAllocator,
    build: &mut BufferBuildData,
    run: &mut BufferRunData,
) {
    if build.ownership == ResourceOwnership::External {
        return;
    }

    let pinned = build.resource_flags.contains(ResourceFlags::PINNED);
    assert!(!run.buffer.buffer.is_valid() || pinned);

    if pinned && run.buffer.buffer.is_valid() {
        return;
    }

    assert!(
        build.desc.size_in_bytes > 0,
        "Buffer '{}' was declared with zero size!",
        build.desc.name
    );

    let desc = heron_rhi::BufferDesc {
        flags: build.creation_flags,
        name: build.desc.name,
    };

    let region = if pinned {
        run.pinned_allocation = device.gpu_alloc(
            build.desc.size_in_bytes as u64,
            GpuAllocationFlags::DEVICE_ONLY,
        );
        GpuMemoryRegion {
            allocation: run.pinned_allocation,
            offset_in_allocation: 0,
            region_size: build.desc.size_in_bytes as u64,
        }
    } else {
        resource_allocator.allocate_memory_region(build.desc.size_in_bytes as u64)
    };

    run.buffer = BufferRegion {
        buffer: device.create_buffer(&desc, &region),
        offset: 0,
        size: build.desc.size_in_bytes,
    };
    build.gpu_region = region;
}

/// Roll the barrier state over when a new pass touches the resource for the
/// first time: current becomes previous, current starts clean.
fn update_texture_barrier_data(
    state: &mut TextureBarrierState,
    pass_idx: u32,
    requires_read_write_barrier: bool,
) {
    if state.barrier_last_updated != pass_idx {
        state.prev_sync_stage = state.curr_sync_stage;
        state.prev_access = state.curr_access;
        state.prev_layout = state.curr_layout;

        state.curr_sync_stage = PipelineSyncStage::empty();
        state.curr_access = PipelineAccess::empty();
        state.curr_layout = TextureLayout::Undefined;

        state.barrier_last_updated = pass_idx;
    }
    state.requires_read_write_barrier = requires_read_write_barrier;
}

fn update_buffer_barrier_data(
    state: &mut BufferBarrierState,
    pass_idx: u32,
    requires_read_write_barrier: bool,
) {
    if state.barrier_last_updated != pass_idx {
        state.prev_sync_stage = state.curr_sync_stage;
        state.prev_access = state.curr_access;

        state.curr_sync_stage = PipelineSyncStage::empty();
        state.curr_access = PipelineAccess::empty();

        state.barrier_last_updated = pass_idx;
    }
    state.requires_read_write_barrier = requires_read_write_barrier;
}

fn render_target_sync_properties(state: &mut TextureBarrierState) {
    state.curr_sync_stage |= PipelineSyncStage::RENDER_TARGET_OUTPUT;
    state.curr_access |= PipelineAccess::RENDER_TARGET_WRITE;
    state.curr_layout = TextureLayout::RenderTarget;
}

fn depth_target_sync_properties(pass_flags: RenderPassFlags, state: &mut TextureBarrierState) {
    if pass_flags.contains(RenderPassFlags::ALL_DRAW_USE_EARLY_Z) {
        state.curr_sync_stage |= PipelineSyncStage::EARLY_DEPTH_TEST;

        assert!(matches!(
            state.curr_layout,
            TextureLayout::Undefined | TextureLayout::DepthTargetRead | TextureLayout::ShaderRead
        ));

        state.curr_access |= PipelineAccess::DEPTH_TARGET_READ;
        state.curr_layout = TextureLayout::DepthTargetRead;
    } else {
        state.curr_sync_stage |= PipelineSyncStage::LATE_DEPTH_TEST;
        state.curr_access |= PipelineAccess::DEPTH_TARGET_READ_WRITE;
        state.curr_layout = TextureLayout::DepthTargetReadWrite;
    }
}

const ALL_SHADER_STAGES: PipelineSyncStage = PipelineSyncStage::from_bits_truncate(
    PipelineSyncStage::VERTEX_SHADER.bits()
        | PipelineSyncStage::PIXEL_SHADER.bits()
        | PipelineSyncStage::COMPUTE_SHADER.bits()
        | PipelineSyncStage::RAY_TRACING.bits(),
);

fn texture_sync_properties(
    access: TextureAccess,
    pass_flags: RenderPassFlags,
    state: &mut TextureBarrierState,
    name: &str,
) {
    match access {
        TextureAccess::ShaderReadOnly => {
            assert!(
                matches!(
                    state.curr_layout,
                    TextureLayout::Undefined
                        | TextureLayout::DepthTargetRead
                        | TextureLayout::ShaderRead
                ),
                "Shader read on '{}' conflicts with its other accesses this pass!",
                name
            );

            state.curr_sync_stage |= ALL_SHADER_STAGES;
            if pass_flags.contains(RenderPassFlags::COMPUTE_ONLY) {
                state.curr_sync_stage = PipelineSyncStage::COMPUTE_SHADER;
            }

            state.curr_access |= PipelineAccess::SHADER_READ;

            // Depth-read-then-sample: keep the depth read layout when the
            // texture is already bound as a read-only depth target.
            if state.curr_layout != TextureLayout::DepthTargetRead {
                state.curr_layout = TextureLayout::ShaderRead;
            }
        }
        TextureAccess::ShaderReadWrite => {
            assert!(
                matches!(
                    state.curr_layout,
                    TextureLayout::Undefined | TextureLayout::ShaderReadWrite
                ),
                "Shader read-write on '{}' conflicts with its other accesses this pass!",
                name
            );

            state.curr_sync_stage |= ALL_SHADER_STAGES;
            if pass_flags.contains(RenderPassFlags::COMPUTE_ONLY) {
                state.curr_sync_stage = PipelineSyncStage::COMPUTE_SHADER;
            }

            state.curr_access |= PipelineAccess::SHADER_READ_WRITE;
            state.curr_layout = TextureLayout::ShaderReadWrite;
        }
        TextureAccess::CopySource => {
            assert!(matches!(
                state.curr_layout,
                TextureLayout::Undefined | TextureLayout::CopyRead
            ));

            state.curr_sync_stage |= PipelineSyncStage::COPY;
            state.curr_access |= PipelineAccess::COPY_READ;
            state.curr_layout = TextureLayout::CopyRead;
        }
        TextureAccess::CopyDest => {
            assert!(matches!(
                state.curr_layout,
                TextureLayout::Undefined | TextureLayout::CopyWrite
            ));

            state.curr_sync_stage |= PipelineSyncStage::COPY;
            state.curr_access |= PipelineAccess::COPY_WRITE;
            state.curr_layout = TextureLayout::CopyWrite;
        }
        TextureAccess::Presentation => {
            // Presentation cannot be combined with any other access.
            assert!(
                state.curr_sync_stage.is_empty() && state.curr_access.is_empty(),
                "Present on '{}' combined with another access in the same pass!",
                name
            );
            assert!(matches!(
                state.curr_layout,
                TextureLayout::Undefined | TextureLayout::Present
            ));

            state.curr_layout = TextureLayout::Present;
        }
    }
}

fn buffer_sync_properties(
    access: BufferAccess,
    pass_flags: RenderPassFlags,
    state: &mut BufferBarrierState,
) {
    match access {
        BufferAccess::ShaderReadOnly => {
            state.curr_sync_stage |= ALL_SHADER_STAGES;
            if pass_flags.contains(RenderPassFlags::COMPUTE_ONLY) {
                state.curr_sync_stage = PipelineSyncStage::COMPUTE_SHADER;
            }

            state.curr_access |= PipelineAccess::SHADER_READ;
        }
        BufferAccess::ShaderReadWrite => {
            state.curr_sync_stage |= ALL_SHADER_STAGES;
            if pass_flags.contains(RenderPassFlags::COMPUTE_ONLY) {
                state.curr_sync_stage = PipelineSyncStage::COMPUTE_SHADER;
            }

            state.curr_access |= PipelineAccess::SHADER_READ_WRITE;
        }
        BufferAccess::CopySource => {
            state.curr_sync_stage |= PipelineSyncStage::COPY;
            state.curr_access |= PipelineAccess::COPY_READ;
        }
        BufferAccess::CopyDest => {
            state.curr_sync_stage |= PipelineSyncStage::COPY;
            state.curr_access |= PipelineAccess::COPY_WRITE;
        }
        BufferAccess::DrawIdBuffer => {
            state.curr_sync_stage |= PipelineSyncStage::INPUT_ASSEMBLY;
            state.curr_access |= PipelineAccess::VERTEX_INPUT;
        }
        BufferAccess::IndexBuffer => {
            state.curr_sync_stage |= PipelineSyncStage::INPUT_ASSEMBLY;
            state.curr_access |= PipelineAccess::INDEX_INPUT;
        }
        BufferAccess::ArgumentBuffer => {
            state.curr_sync_stage |= PipelineSyncStage::INDIRECT_COMMAND;
            state.curr_access |= PipelineAccess::COMMAND_INPUT;
        }
        BufferAccess::UniformBuffer => {
            state.curr_sync_stage |= PipelineSyncStage::VERTEX_SHADER
                | PipelineSyncStage::PIXEL_SHADER
                | PipelineSyncStage::COMPUTE_SHADER;
            if pass_flags.contains(RenderPassFlags::COMPUTE_ONLY) {
                state.curr_sync_stage = PipelineSyncStage::COMPUTE_SHADER;
            }

            state.curr_access |= PipelineAccess::UNIFORM_BUFFER;
        }
    }
}
