use std::sync::Arc;

use heron_rg::*;
use heron_rhi::null::{DeviceCall, NullDevice, RecordedCommand};
use heron_rhi::{
    Device, LoadOp, PipelineAccess, PipelineSyncStage, RenderTargetFormat, TextureFormat,
    TextureLayout, Viewport, TRANSIENT_PAGE_SIZE,
};

fn viewport(width: u32, height: u32) -> Viewport {
    Viewport {
        x: 0,
        y: 0,
        width,
        height,
    }
}

fn make_graph() -> (NullDevice, RenderGraph) {
    heron_log::setup_for_test();

    let device = NullDevice::new();
    let graph = RenderGraph::new(Arc::new(device.clone()));
    (device, graph)
}

fn barriers_of(commands: &[RecordedCommand]) -> Vec<&RecordedCommand> {
    commands
        .iter()
        .filter(|c| matches!(c, RecordedCommand::Barrier { .. }))
        .collect()
}

#[test]
pub fn test_empty_frame_is_a_no_op() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1920, 1080));
    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    assert!(device.submissions().is_empty());
    assert_eq!(
        0,
        device.call_count(|c| matches!(c, DeviceCall::AllocateCommandList { .. }))
    );
}

#[test]
pub fn test_single_compute_pass_writing_internal_buffer() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1920, 1080));
    let b = graph.allocate_buffer(BufferDesc {
        size_in_bytes: 1024,
        name: "B",
        ..Default::default()
    });

    graph.add_render_pass(
        &RenderPassDesc {
            name: "P",
            flags: RenderPassFlags::IS_SMALL | RenderPassFlags::COMPUTE_ONLY,
            buffers: &[BufferUsage::shader_read_write(b)],
            ..Default::default()
        },
        &(),
    );

    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    // One device buffer, placed on a page of the transient pool.
    let buffer_creates: Vec<_> = device
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            DeviceCall::CreateBuffer { region, .. } => Some(region),
            _ => None,
        })
        .collect();
    assert_eq!(1, buffer_creates.len());
    assert_eq!(TRANSIENT_PAGE_SIZE, buffer_creates[0].region_size);

    // One read-write view.
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateRWBufferView { .. }))
    );

    // One barrier: nothing -> compute shader read-write.
    let commands = device.submitted_commands();
    let barriers = barriers_of(&commands);
    assert_eq!(1, barriers.len());
    if let RecordedCommand::Barrier {
        buffer_barriers, ..
    } = barriers[0]
    {
        assert_eq!(1, buffer_barriers.len());
        let barrier = &buffer_barriers[0];
        assert!(barrier.from_stage.is_empty());
        assert!(barrier.from_access.is_empty());
        assert_eq!(PipelineSyncStage::COMPUTE_SHADER, barrier.to_stage);
        assert_eq!(PipelineAccess::SHADER_READ_WRITE, barrier.to_access);
        assert_eq!(1024, barrier.size);
    }

    // A compute pass records no device-level render pass.
    assert!(!commands
        .iter()
        .any(|c| matches!(c, RecordedCommand::BeginRenderPass { .. })));

    // One command list submitted.
    assert_eq!(vec![vec![0u32]], device.submissions());

    // The buffer is destroyed when the next frame opens.
    assert_eq!(0, device.call_count(|c| matches!(c, DeviceCall::DestroyBuffer(_))));
    graph.reset(viewport(1920, 1080));
    assert_eq!(1, device.call_count(|c| matches!(c, DeviceCall::DestroyBuffer(_))));
}

#[test]
pub fn test_producer_consumer_texture_barrier() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1920, 1080));
    let t = graph.allocate_texture_2d(Texture2DDesc {
        width: 512,
        height: 512,
        format: TextureFormat::RGBA8Unorm,
        render_format: RenderTargetFormat::RGBA8Unorm,
        size_mode: TextureSizeMode::Fixed,
        name: "T",
        ..Default::default()
    });

    graph.add_render_pass(
        &RenderPassDesc {
            name: "P0",
            color_attachments: &[TextureAttachment {
                texture: t,
                load_op: LoadOp::Clear,
            }],
            ..Default::default()
        },
        &(),
    );
    graph.add_render_pass(
        &RenderPassDesc {
            name: "P1",
            texture_2ds: &[Texture2DUsage::shader_read_only(t)],
            ..Default::default()
        },
        &(),
    );

    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateTexture2D { .. }))
    );
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateRenderTargetView { .. }))
    );
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateTexture2DView { .. }))
    );

    // Two non-small passes, two command lists, one ordered submit.
    assert_eq!(vec![vec![0u32, 1u32]], device.submissions());

    // P0 enters the render target layout, P1 transitions it to shader read
    // over all mips.
    let p0_commands = device.commands(0);
    let p0_barriers = barriers_of(&p0_commands);
    assert_eq!(1, p0_barriers.len());
    if let RecordedCommand::Barrier {
        texture_2d_barriers,
        ..
    } = p0_barriers[0]
    {
        assert_eq!(1, texture_2d_barriers.len());
        let barrier = &texture_2d_barriers[0];
        assert_eq!(TextureLayout::Undefined, barrier.from_layout);
        assert_eq!(TextureLayout::RenderTarget, barrier.to_layout);
        assert_eq!(PipelineAccess::RENDER_TARGET_WRITE, barrier.to_access);
    }

    assert!(p0_commands.iter().any(|c| matches!(
        c,
        RecordedCommand::BeginRenderPass { viewport, render_targets, .. }
            if viewport.width == 1920 && render_targets.len() == 1
                && render_targets[0].load_op == LoadOp::Clear
    )));

    let p1_commands = device.commands(1);
    let p1_barriers = barriers_of(&p1_commands);
    assert_eq!(1, p1_barriers.len());
    if let RecordedCommand::Barrier {
        texture_2d_barriers,
        ..
    } = p1_barriers[0]
    {
        assert_eq!(1, texture_2d_barriers.len());
        let barrier = &texture_2d_barriers[0];

        assert_eq!(PipelineSyncStage::RENDER_TARGET_OUTPUT, barrier.from_stage);
        assert_eq!(PipelineAccess::RENDER_TARGET_WRITE, barrier.from_access);
        assert_eq!(TextureLayout::RenderTarget, barrier.from_layout);

        assert!(barrier.to_stage.contains(PipelineSyncStage::PIXEL_SHADER));
        assert_eq!(PipelineAccess::SHADER_READ, barrier.to_access);
        assert_eq!(TextureLayout::ShaderRead, barrier.to_layout);

        assert_eq!(0, barrier.first_mip_level);
        assert_eq!(1, barrier.num_mips);
    }
}

#[test]
pub fn test_adaptive_texture_resolves_against_first_use_viewport() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1280, 720));
    let t = graph.allocate_texture_2d(Texture2DDesc {
        width: 2,
        height: 2,
        format: TextureFormat::RGBA16Float,
        size_mode: TextureSizeMode::Adaptive,
        name: "half-res",
        ..Default::default()
    });

    graph.add_render_pass(
        &RenderPassDesc {
            name: "P0",
            flags: RenderPassFlags::COMPUTE_ONLY,
            texture_2ds: &[Texture2DUsage::shader_read_write(t, 0)],
            ..Default::default()
        },
        &(),
    );

    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    assert!(device.calls().iter().any(|c| matches!(
        c,
        DeviceCall::CreateTexture2D { width: 640, height: 360, .. }
    )));
}

#[test]
pub fn test_pinned_texture_survives_frames() {
    let (device, mut graph) = make_graph();

    // Frame 0
    graph.reset(viewport(1280, 720));
    let t = graph.allocate_texture_2d(Texture2DDesc {
        width: 256,
        height: 256,
        format: TextureFormat::R32Float,
        size_mode: TextureSizeMode::Fixed,
        flags: ResourceFlags::PINNED,
        name: "history",
        ..Default::default()
    });

    graph.add_render_pass(
        &RenderPassDesc {
            name: "P",
            flags: RenderPassFlags::COMPUTE_ONLY,
            texture_2ds: &[Texture2DUsage::shader_read_write_synced(t, 0)],
            ..Default::default()
        },
        &(),
    );
    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateTexture2D { .. }))
    );
    assert_eq!(1, device.submissions().len());

    // Frame 1: the same handle stays live across the reset.
    graph.reset(viewport(1280, 720));
    graph.add_render_pass(
        &RenderPassDesc {
            name: "P",
            flags: RenderPassFlags::COMPUTE_ONLY,
            texture_2ds: &[Texture2DUsage::shader_read_write_synced(t, 0)],
            ..Default::default()
        },
        &(),
    );
    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    // No re-creation, no destruction between frames, and the second frame
    // still emits its own barrier.
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateTexture2D { .. }))
    );
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateRWTexture2DView { .. }))
    );
    assert_eq!(
        0,
        device.call_count(|c| matches!(c, DeviceCall::DestroyTexture2D(_)))
    );

    let submissions = device.submissions();
    assert_eq!(2, submissions.len());
    let frame1_commands = device.commands(submissions[1][0]);
    assert_eq!(1, barriers_of(&frame1_commands).len());

    // The pinned allocation is a dedicated one, not a transient page pool.
    assert_eq!(
        1,
        device.call_count(|c| matches!(
            c,
            DeviceCall::GpuAlloc { size_in_bytes, .. } if *size_in_bytes < TRANSIENT_PAGE_SIZE * 4096
        ))
    );

    // Teardown finally destroys the pinned texture and frees its memory.
    drop(graph);
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::DestroyTexture2D(_)))
    );
}

#[test]
pub fn test_internal_buffer_create_destroy_is_idempotent_across_frames() {
    let (device, mut graph) = make_graph();

    for _ in 0..3 {
        graph.reset(viewport(800, 600));
        let b = graph.allocate_buffer(BufferDesc {
            size_in_bytes: 4096,
            name: "scratch",
            ..Default::default()
        });
        graph.add_render_pass(
            &RenderPassDesc {
                name: "fill",
                flags: RenderPassFlags::COMPUTE_ONLY,
                buffers: &[BufferUsage::shader_read_write(b)],
                ..Default::default()
            },
            &(),
        );
        graph.build();
        graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);
    }
    graph.reset(viewport(800, 600));

    assert_eq!(
        3,
        device.call_count(|c| matches!(c, DeviceCall::CreateBuffer { .. }))
    );
    assert_eq!(
        3,
        device.call_count(|c| matches!(c, DeviceCall::DestroyBuffer(_)))
    );
}

#[test]
pub fn test_small_passes_merge_into_one_command_list() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1024, 768));
    for (name, flags) in [
        ("P0", RenderPassFlags::IS_SMALL),
        ("P1", RenderPassFlags::IS_SMALL),
        ("P2", RenderPassFlags::empty()),
    ] {
        graph.add_render_pass(
            &RenderPassDesc {
                name,
                flags: flags | RenderPassFlags::COMPUTE_ONLY,
                ..Default::default()
            },
            &(),
        );
    }

    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    // One command list carries all three passes.
    assert_eq!(vec![vec![0u32]], device.submissions());

    let commands = device.commands(0);
    let events: Vec<_> = commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::BeginEvent(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(vec!["P0", "P1", "P2"], events);
}

#[test]
pub fn test_parallel_execution_batches_and_preserves_order() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1024, 768));
    for (name, flags) in [
        ("P0", RenderPassFlags::IS_SMALL),
        ("P1", RenderPassFlags::empty()),
        ("P2", RenderPassFlags::IS_SMALL),
        ("P3", RenderPassFlags::empty()),
    ] {
        graph.add_render_pass(
            &RenderPassDesc {
                name,
                flags: flags | RenderPassFlags::COMPUTE_ONLY,
                ..Default::default()
            },
            &(),
        );
    }

    graph.build();
    graph.execute(RenderGraphExecutionFlags::empty());

    // Two recording batches: [P0, P1] and [P2, P3].
    assert_eq!(
        2,
        device.call_count(|c| matches!(c, DeviceCall::AllocateCommandList { .. }))
    );

    let submissions = device.submissions();
    assert_eq!(1, submissions.len());
    assert_eq!(2, submissions[0].len());

    let event_names = |id: u32| -> Vec<String> {
        device
            .commands(id)
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginEvent(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    };

    // Submission order is declaration order regardless of which worker
    // recorded first.
    assert_eq!(vec!["P0", "P1"], event_names(submissions[0][0]));
    assert_eq!(vec!["P2", "P3"], event_names(submissions[0][1]));
}

#[test]
pub fn test_pass_callback_resolves_and_records() {
    let (device, mut graph) = make_graph();

    #[derive(Clone, Copy)]
    struct FillParams {
        group_count: u32,
    }

    fn fill(
        _device: &dyn Device,
        context: &mut PassExecutionContext,
        params: &FillParams,
        _pass_idx: u32,
    ) {
        assert_eq!(4, params.group_count);

        let constants = [0u8; 64];
        let _view = context.allocate_temporary_uniform_buffer_view(&constants);

        context.command_list().dispatch(&[heron_rhi::DispatchPacket {
            pipeline: heron_rhi::ComputePipeline::INVALID,
            x: params.group_count,
            y: 1,
            z: 1,
        }]);
    }

    graph.reset(viewport(640, 480));
    let b = graph.allocate_buffer(BufferDesc {
        size_in_bytes: 256,
        name: "out",
        ..Default::default()
    });
    graph.add_render_pass(
        &RenderPassDesc {
            name: "fill",
            flags: RenderPassFlags::COMPUTE_ONLY,
            buffers: &[BufferUsage::shader_read_write(b)],
            on_execute: fill,
            ..Default::default()
        },
        &FillParams { group_count: 4 },
    );

    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    let commands = device.commands(0);
    assert!(commands
        .iter()
        .any(|c| matches!(c, RecordedCommand::Dispatch { packet_count: 1 })));
    assert!(commands
        .iter()
        .any(|c| matches!(c, RecordedCommand::AllocateTemporaryResource { size_in_bytes: 64, .. })));

    // The context destroyed its temporary view when the pass ended.
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateUniformBufferView { .. }))
    );
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::DestroyUniformBufferView(_)))
    );
}

#[test]
pub fn test_registered_external_texture_is_borrowed_not_owned() {
    let (device, mut graph) = make_graph();

    // The application owns this texture and its view; the graph only tracks it.
    let external_texture = device.create_texture_2d(
        &heron_rhi::Texture2DDesc {
            flags: heron_rhi::TextureCreationFlags::ALLOW_SHADER_READ_ONLY
                | heron_rhi::TextureCreationFlags::ALLOW_RENDER_TARGET,
            width: 800,
            height: 600,
            array_size: 1,
            mip_levels: 1,
            format: TextureFormat::BGRA8Unorm,
            opt_clear_value: None,
            name: "app-target",
        },
        &heron_rhi::GpuMemoryRegion::default(),
    );
    let external_view = device.create_texture_2d_view(&heron_rhi::Texture2DViewDesc {
        texture: external_texture,
        format: TextureFormat::BGRA8Unorm,
        mip_count: 1,
    });

    graph.reset(viewport(800, 600));
    let t = graph.register_texture_2d(&Texture2DRegistrationDesc {
        texture: external_texture,
        view: external_view,
        last_sync_stage: PipelineSyncStage::RENDER_TARGET_OUTPUT,
        last_access: PipelineAccess::RENDER_TARGET_WRITE,
        last_layout: TextureLayout::RenderTarget,
        name: "app-target",
        ..Default::default()
    });

    // Reading an external at its first use is fine, the application wrote it.
    graph.add_render_pass(
        &RenderPassDesc {
            name: "sample",
            texture_2ds: &[Texture2DUsage::shader_read_only(t)],
            ..Default::default()
        },
        &(),
    );
    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    // The barrier comes out of the externally provided last state.
    let commands = device.submitted_commands();
    let barriers = barriers_of(&commands);
    assert_eq!(1, barriers.len());
    if let RecordedCommand::Barrier {
        texture_2d_barriers,
        ..
    } = barriers[0]
    {
        assert_eq!(PipelineSyncStage::RENDER_TARGET_OUTPUT, texture_2d_barriers[0].from_stage);
        assert_eq!(TextureLayout::RenderTarget, texture_2d_barriers[0].from_layout);
        assert_eq!(TextureLayout::ShaderRead, texture_2d_barriers[0].to_layout);
    }

    // Only the application's own create calls; the graph added none, and the
    // reset destroys none.
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateTexture2D { .. }))
    );
    assert_eq!(
        1,
        device.call_count(|c| matches!(c, DeviceCall::CreateTexture2DView { .. }))
    );

    graph.reset(viewport(800, 600));
    assert_eq!(
        0,
        device.call_count(|c| matches!(c, DeviceCall::DestroyTexture2D(_)))
    );
    assert_eq!(
        0,
        device.call_count(|c| matches!(c, DeviceCall::DestroyTexture2DView(_)))
    );
}

#[test]
#[should_panic]
pub fn test_present_combined_with_other_access_asserts() {
    let (_device, mut graph) = make_graph();

    graph.reset(viewport(640, 480));
    let t = graph.allocate_texture_2d(Texture2DDesc {
        width: 64,
        height: 64,
        format: TextureFormat::RGBA8Unorm,
        size_mode: TextureSizeMode::Fixed,
        name: "present-conflict",
        ..Default::default()
    });

    graph.add_render_pass(
        &RenderPassDesc {
            name: "bad-present",
            flags: RenderPassFlags::COMPUTE_ONLY,
            texture_2ds: &[
                Texture2DUsage::shader_read_write(t, 0),
                Texture2DUsage::present(t),
            ],
            ..Default::default()
        },
        &(),
    );

    graph.build();
}

#[test]
#[should_panic]
pub fn test_reading_internal_resource_at_first_use_asserts() {
    let (_device, mut graph) = make_graph();

    graph.reset(viewport(640, 480));
    let t = graph.allocate_texture_2d(Texture2DDesc {
        width: 64,
        height: 64,
        format: TextureFormat::RGBA8Unorm,
        size_mode: TextureSizeMode::Fixed,
        name: "never-written",
        ..Default::default()
    });

    graph.add_render_pass(
        &RenderPassDesc {
            name: "bad-read",
            texture_2ds: &[Texture2DUsage::shader_read_only(t)],
            ..Default::default()
        },
        &(),
    );

    graph.build();
}

#[test]
#[should_panic]
pub fn test_stale_handle_from_previous_frame_asserts() {
    let (_device, mut graph) = make_graph();

    graph.reset(viewport(640, 480));
    let b = graph.allocate_buffer(BufferDesc {
        size_in_bytes: 64,
        name: "frame0",
        ..Default::default()
    });
    graph.add_render_pass(
        &RenderPassDesc {
            name: "P",
            flags: RenderPassFlags::COMPUTE_ONLY,
            buffers: &[BufferUsage::shader_read_write(b)],
            ..Default::default()
        },
        &(),
    );
    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    // Non-pinned internal resources die with the frame; their handles must not resolve.
    graph.reset(viewport(640, 480));
    graph.add_render_pass(
        &RenderPassDesc {
            name: "P",
            flags: RenderPassFlags::COMPUTE_ONLY,
            buffers: &[BufferUsage::shader_read_write(b)],
            ..Default::default()
        },
        &(),
    );
    graph.build();
}

#[test]
#[should_panic]
pub fn test_add_render_pass_on_closed_graph_asserts() {
    let (_device, mut graph) = make_graph();

    graph.add_render_pass(&RenderPassDesc::<()>::default(), &());
}

#[test]
pub fn test_viewport_stack_tracks_pass_capture() {
    let (device, mut graph) = make_graph();

    graph.reset(viewport(1920, 1080));
    assert_eq!(1920, graph.current_viewport().width);

    graph.push_viewport(viewport(960, 540));
    assert_eq!(960, graph.current_viewport().width);

    // A half-res adaptive texture first seen under the pushed viewport.
    let t = graph.allocate_texture_2d(Texture2DDesc {
        width: 2,
        height: 2,
        format: TextureFormat::RGBA8Unorm,
        size_mode: TextureSizeMode::Adaptive,
        name: "quarter",
        ..Default::default()
    });
    graph.add_render_pass(
        &RenderPassDesc {
            name: "P",
            flags: RenderPassFlags::COMPUTE_ONLY,
            texture_2ds: &[Texture2DUsage::shader_read_write(t, 0)],
            ..Default::default()
        },
        &(),
    );

    graph.pop_viewport();
    assert_eq!(1920, graph.current_viewport().width);

    graph.build();
    graph.execute(RenderGraphExecutionFlags::FORCE_SINGLE_THREADED);

    assert!(device.calls().iter().any(|c| matches!(
        c,
        DeviceCall::CreateTexture2D { width: 480, height: 270, .. }
    )));
}
