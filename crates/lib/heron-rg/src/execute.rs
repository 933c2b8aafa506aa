//! Command recording and submission, either on the calling thread or fanned
//! out in batches over the task scheduler. Both modes submit in declared
//! pass order.

use std::sync::Arc;

use parking_lot::Mutex;

use heron_container::Handle;
use heron_rhi::{BarrierDesc, CommandList, Device, RenderPassBeginDesc};

use crate::graph::RenderGraph;
use crate::graph_resource::RenderGraphResources;
use crate::pass::{PassExecutionData, RenderPassFlags};
use crate::pass_context::PassExecutionContext;

fn record_pass(
    device: &dyn Device,
    resources: &RenderGraphResources,
    pass: &PassExecutionData,
    command_list: &mut dyn CommandList,
    pass_idx: u32,
) {
    command_list.begin_event(pass.name);

    // Barrier spans live in the frame arena until the next reset.
    let buffer_barriers = unsafe { pass.buffer_barriers.as_slice() };
    let texture_2d_barriers = unsafe { pass.texture_2d_barriers.as_slice() };
    let texture_3d_barriers = unsafe { pass.texture_3d_barriers.as_slice() };

    if !buffer_barriers.is_empty()
        || !texture_2d_barriers.is_empty()
        || !texture_3d_barriers.is_empty()
    {
        command_list.barrier(&BarrierDesc {
            buffer_barriers,
            texture_2d_barriers,
            texture_3d_barriers,
        });
    }

    // Compute or copy only passes don't need a device-level render pass.
    let render_targets = unsafe { pass.render_targets.as_slice() };
    let needs_render_pass = !render_targets.is_empty() || pass.depth_target.view.is_valid();

    if needs_render_pass {
        command_list.begin_render_pass(&RenderPassBeginDesc {
            viewport: pass.viewport,
            render_targets,
            depth_target: pass.depth_target,
        });
    }

    {
        let mut context =
            PassExecutionContext::new(device, command_list, pass.viewport, resources, pass_idx);
        unsafe {
            (pass.trampoline)(device, &mut context, pass.payload, pass_idx);
        }
        // dropping the context destroys its temporary views
    }

    if needs_render_pass {
        command_list.end_render_pass();
    }

    command_list.end_event();
}

pub(crate) fn execute_single_threaded(graph: &RenderGraph) {
    let device = graph.device.as_ref();
    let resources = graph.resources();

    let mut command_lists: Vec<Box<dyn CommandList>> =
        Vec::with_capacity(graph.pass_execution.len());
    let mut current: Option<Box<dyn CommandList>> = None;

    for (pass_idx, pass) in graph.pass_execution.iter().enumerate() {
        let command_list = current.get_or_insert_with(|| device.allocate_command_list());

        record_pass(
            device,
            &resources,
            pass,
            command_list.as_mut(),
            pass_idx as u32,
        );

        // Runs of small passes merge into the next non-small pass's list.
        if !pass.flags.contains(RenderPassFlags::IS_SMALL) {
            command_lists.push(current.take().unwrap());
        }
    }

    if let Some(command_list) = current.take() {
        command_lists.push(command_list);
    }

    if !command_lists.is_empty() {
        device.submit_command_lists(command_lists);
    }
}

pub(crate) fn execute_parallel(graph: &RenderGraph) {
    let pass_count = graph.pass_execution.len();
    if pass_count == 0 {
        return;
    }

    // A batch is a run of small passes closed by a non-small pass, or by
    // the end of the frame.
    let mut batches: Vec<(u32, u32)> = Vec::new();
    let mut batch_start = 0u32;
    let mut batch_len = 0u32;
    for (pass_idx, pass) in graph.pass_execution.iter().enumerate() {
        batch_len += 1;

        if !pass.flags.contains(RenderPassFlags::IS_SMALL) || pass_idx + 1 == pass_count {
            batches.push((batch_start, batch_len));
            batch_start = pass_idx as u32 + 1;
            batch_len = 0;
        }
    }

    #[derive(Clone, Copy)]
    struct GraphPtr(*const RenderGraph);
    // Recording jobs only read built pass data and pools; execute() blocks
    // on every job before returning, so the graph outlives them all.
    unsafe impl Send for GraphPtr {}
    unsafe impl Sync for GraphPtr {}

    let graph_ptr = GraphPtr(graph as *const RenderGraph);
    let scheduler = heron_thread::global();

    let slots: Vec<Arc<Mutex<Option<Box<dyn CommandList>>>>> =
        (0..batches.len()).map(|_| Arc::new(Mutex::new(None))).collect();

    let handles = batches
        .iter()
        .zip(slots.iter())
        .map(|(&(start, count), slot)| {
            let slot = slot.clone();
            let device = graph.device.clone();

            scheduler.spawn(move || {
                // Force capture of the whole `GraphPtr` wrapper (and its `unsafe impl Send`)
                // rather than the bare `*const RenderGraph` field via 2021 disjoint capture.
                let graph_ptr = graph_ptr;
                let graph = unsafe { &*graph_ptr.0 };
                let resources = graph.resources();

                let mut command_list = device.allocate_command_list();
                for pass_idx in start..start + count {
                    record_pass(
                        device.as_ref(),
                        &resources,
                        &graph.pass_execution[pass_idx as usize],
                        command_list.as_mut(),
                        pass_idx,
                    );
                }

                *slot.lock() = Some(command_list);
            })
        })
        .collect::<Vec<_>>();

    scheduler.wait_all(&handles);

    // Submission order is declaration order, not completion order.
    let command_lists = slots
        .into_iter()
        .map(|slot| {
            slot.lock()
                .take()
                .expect("A recording job finished without producing a command list!")
        })
        .collect::<Vec<_>>();

    graph.device.submit_command_lists(command_lists);
}
