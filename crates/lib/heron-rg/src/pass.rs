use bitflags::bitflags;

use heron_container::ScratchSlice;
use heron_rhi::{
    BufferBarrier, Device, RenderPassDepthTarget, RenderPassRenderTarget, Texture2DBarrier,
    Texture3DBarrier, Viewport,
};

use crate::pass_context::PassExecutionContext;
use crate::resource::{BufferUsage, Texture2DUsage, Texture3DUsage, TextureAttachment, Tlas};

bitflags! {
    pub struct RenderPassFlags: u32 {
        /// Potentially merge this pass together with its neighbors in one
        /// command list.
        const IS_SMALL = 0x01;
        /// The pass only contains compute work.
        const COMPUTE_ONLY = 0x02;
        /// Every draw in the pass is guaranteed to not require late Z.
        const ALL_DRAW_USE_EARLY_Z = 0x04;
        /// The depth target attachment is read-only.
        const READ_ONLY_DEPTH = 0x08;
    }
}

impl Default for RenderPassFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    pub struct RenderGraphExecutionFlags: u32 {
        const FORCE_SINGLE_THREADED = 0x01;
    }
}

impl Default for RenderGraphExecutionFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Callback recording the pass's commands. Invoked once per execution,
/// possibly from a worker thread.
pub type FnExecuteRenderPass<T> = fn(&dyn Device, &mut PassExecutionContext, &T, u32);

/// Everything a pass declares up front. Usage lists are borrowed; the graph
/// copies them into its frame arena on `add_render_pass`.
pub struct RenderPassDesc<'a, T> {
    pub name: &'static str,
    pub flags: RenderPassFlags,

    pub color_attachments: &'a [TextureAttachment],
    pub depth_attachment: TextureAttachment,

    pub texture_2ds: &'a [Texture2DUsage],
    pub texture_3ds: &'a [Texture3DUsage],
    pub buffers: &'a [BufferUsage],
    pub tlases: &'a [Tlas],

    pub on_execute: FnExecuteRenderPass<T>,
}

impl<'a, T> Default for RenderPassDesc<'a, T> {
    fn default() -> Self {
        Self {
            name: "",
            flags: RenderPassFlags::empty(),
            color_attachments: &[],
            depth_attachment: TextureAttachment::default(),
            texture_2ds: &[],
            texture_3ds: &[],
            buffers: &[],
            tlases: &[],
            on_execute: |_, _, _, _| {},
        }
    }
}

/// Typed callback and its pass data, copied side by side into the frame
/// arena so the trampoline can reimpose `T` at execution time.
#[derive(Clone, Copy)]
pub(crate) struct PassPayload<T> {
    pub func: FnExecuteRenderPass<T>,
    pub data: T,
}

pub(crate) type ErasedExecuteFn =
    unsafe fn(&dyn Device, &mut PassExecutionContext, *const (), u32);

/// # Safety
/// `payload` must point at a live `PassPayload<T>` of the `T` this function
/// was instantiated with.
pub(crate) unsafe fn execute_trampoline<T>(
    device: &dyn Device,
    context: &mut PassExecutionContext,
    payload: *const (),
    pass_idx: u32,
) {
    let payload = &*(payload as *const PassPayload<T>);
    (payload.func)(device, context, &payload.data, pass_idx);
}

unsafe fn noop_trampoline(
    _device: &dyn Device,
    _context: &mut PassExecutionContext,
    _payload: *const (),
    _pass_idx: u32,
) {
}

/// Declaration-time copy of a pass, living in the frame arena.
pub(crate) struct PassBuildData {
    pub name: &'static str,
    pub flags: RenderPassFlags,

    pub color_attachments: ScratchSlice<TextureAttachment>,
    pub depth_attachment: TextureAttachment,

    pub texture_2ds: ScratchSlice<Texture2DUsage>,
    pub texture_3ds: ScratchSlice<Texture3DUsage>,
    pub buffers: ScratchSlice<BufferUsage>,
    pub tlases: ScratchSlice<Tlas>,
}

/// Everything execution needs per pass once the graph is built.
pub(crate) struct PassExecutionData {
    pub name: &'static str,
    pub flags: RenderPassFlags,

    pub viewport: Viewport,

    pub buffer_barriers: ScratchSlice<BufferBarrier>,
    pub texture_2d_barriers: ScratchSlice<Texture2DBarrier>,
    pub texture_3d_barriers: ScratchSlice<Texture3DBarrier>,

    pub render_targets: ScratchSlice<RenderPassRenderTarget>,
    pub depth_target: RenderPassDepthTarget,

    pub trampoline: ErasedExecuteFn,
    pub payload: *const (),
}

impl Default for PassExecutionData {
    fn default() -> Self {
        Self {
            name: "",
            flags: RenderPassFlags::empty(),
            viewport: Viewport::default(),
            buffer_barriers: ScratchSlice::empty(),
            texture_2d_barriers: ScratchSlice::empty(),
            texture_3d_barriers: ScratchSlice::empty(),
            render_targets: ScratchSlice::empty(),
            depth_target: RenderPassDepthTarget::default(),
            trampoline: noop_trampoline,
            payload: std::ptr::null(),
        }
    }
}

// Pass data is written while the graph is open and read-only once execution
// fans out to workers; payloads are `Sync` by the `add_render_pass` bound.
unsafe impl Send for PassExecutionData {}
unsafe impl Sync for PassExecutionData {}
