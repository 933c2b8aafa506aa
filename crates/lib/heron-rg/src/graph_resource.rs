//! Internal per-resource bookkeeping, split into pool hot and cold halves.
//!
//! Cold data is only touched while the graph is being declared and built;
//! hot data is what pass callbacks resolve against during execution.

use heron_container::ObjectPool;
use heron_rhi::{
    ClearValue, GpuAllocation, GpuMemoryRegion, PipelineAccess, PipelineSyncStage,
    TextureCreationFlags, TextureLayout,
};

use crate::resource::{
    Buffer, BufferDesc, BufferRegion, ResourceFlags, Texture2D, Texture2DDesc, Texture3D,
    Texture3DDesc,
};

pub const MAX_RENDER_PASS_COUNT: usize = 128;
pub const MAX_VIEWPORT_STACK_SIZE: usize = 16;
pub const MAX_RW_VIEWS: usize = 16;

pub(crate) const INVALID_PASS_INDEX: u32 = u32::MAX;
pub(crate) const RESOURCE_POOL_CAPACITY: u32 = 256;
pub(crate) const SCRATCH_ARENA_BYTES: usize = 16 * 1024 * 1024;
pub(crate) const TRANSIENT_PAGES_PER_BACKING: u32 = 4096;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ResourceOwnership {
    Internal,
    External,
}

/// One bit per pass, sized to the maximum pass count of a graph.
#[derive(Clone, Copy, Default)]
pub(crate) struct PassAccessMask(u128);

impl PassAccessMask {
    #[inline]
    pub fn set(&mut self, pass_idx: u32) {
        debug_assert!((pass_idx as usize) < MAX_RENDER_PASS_COUNT);
        self.0 |= 1u128 << pass_idx;
    }

    #[inline]
    pub fn test(&self, pass_idx: u32) -> bool {
        (self.0 >> pass_idx) & 1 != 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// What the graph believes a texture's state on the GPU timeline is, split
/// into the state of the previous pass that touched it and the one being
/// folded right now.
#[derive(Clone, Copy)]
pub(crate) struct TextureBarrierState {
    pub barrier_last_updated: u32,

    pub prev_sync_stage: PipelineSyncStage,
    pub prev_access: PipelineAccess,
    pub prev_layout: TextureLayout,

    pub curr_sync_stage: PipelineSyncStage,
    pub curr_access: PipelineAccess,
    pub curr_layout: TextureLayout,

    pub requires_read_write_barrier: bool,
}

impl Default for TextureBarrierState {
    fn default() -> Self {
        Self {
            barrier_last_updated: INVALID_PASS_INDEX,
            prev_sync_stage: PipelineSyncStage::empty(),
            prev_access: PipelineAccess::empty(),
            prev_layout: TextureLayout::Undefined,
            curr_sync_stage: PipelineSyncStage::empty(),
            curr_access: PipelineAccess::empty(),
            curr_layout: TextureLayout::Undefined,
            requires_read_write_barrier: false,
        }
    }
}

/// Buffers carry no layout, otherwise identical to [`TextureBarrierState`].
#[derive(Clone, Copy)]
pub(crate) struct BufferBarrierState {
    pub barrier_last_updated: u32,

    pub prev_sync_stage: PipelineSyncStage,
    pub prev_access: PipelineAccess,

    pub curr_sync_stage: PipelineSyncStage,
    pub curr_access: PipelineAccess,

    pub requires_read_write_barrier: bool,
}

impl Default for BufferBarrierState {
    fn default() -> Self {
        Self {
            barrier_last_updated: INVALID_PASS_INDEX,
            prev_sync_stage: PipelineSyncStage::empty(),
            prev_access: PipelineAccess::empty(),
            curr_sync_stage: PipelineSyncStage::empty(),
            curr_access: PipelineAccess::empty(),
            requires_read_write_barrier: false,
        }
    }
}

pub(crate) struct Texture2DBuildData {
    pub desc: Texture2DDesc,

    pub first_used_pass: u32,
    pub last_used_pass: u32,

    pub resource_flags: ResourceFlags,
    pub creation_flags: TextureCreationFlags,
    pub rw_view_mip_bitmask: u32,
    pub ownership: ResourceOwnership,

    pub gpu_region: GpuMemoryRegion,

    pub barrier: TextureBarrierState,
}

impl Texture2DBuildData {
    pub fn internal(desc: Texture2DDesc) -> Self {
        Self {
            resource_flags: desc.flags,
            desc,
            first_used_pass: INVALID_PASS_INDEX,
            last_used_pass: INVALID_PASS_INDEX,
            creation_flags: TextureCreationFlags::empty(),
            rw_view_mip_bitmask: 0,
            ownership: ResourceOwnership::Internal,
            gpu_region: GpuMemoryRegion::default(),
            barrier: TextureBarrierState::default(),
        }
    }
}

pub(crate) struct Texture3DBuildData {
    pub desc: Texture3DDesc,

    pub first_used_pass: u32,
    pub last_used_pass: u32,

    pub resource_flags: ResourceFlags,
    pub creation_flags: TextureCreationFlags,
    pub rw_view_mip_bitmask: u32,
    pub ownership: ResourceOwnership,

    pub gpu_region: GpuMemoryRegion,

    pub barrier: TextureBarrierState,
}

impl Texture3DBuildData {
    pub fn internal(desc: Texture3DDesc) -> Self {
        Self {
            resource_flags: desc.flags,
            desc,
            first_used_pass: INVALID_PASS_INDEX,
            last_used_pass: INVALID_PASS_INDEX,
            creation_flags: TextureCreationFlags::empty(),
            rw_view_mip_bitmask: 0,
            ownership: ResourceOwnership::Internal,
            gpu_region: GpuMemoryRegion::default(),
            barrier: TextureBarrierState::default(),
        }
    }
}

pub(crate) struct BufferBuildData {
    pub desc: BufferDesc,

    pub first_used_pass: u32,
    pub last_used_pass: u32,

    pub resource_flags: ResourceFlags,
    pub creation_flags: heron_rhi::BufferCreationFlags,
    pub ownership: ResourceOwnership,

    pub gpu_region: GpuMemoryRegion,

    pub barrier: BufferBarrierState,
}

impl BufferBuildData {
    pub fn internal(desc: BufferDesc) -> Self {
        Self {
            resource_flags: desc.flags,
            desc,
            first_used_pass: INVALID_PASS_INDEX,
            last_used_pass: INVALID_PASS_INDEX,
            creation_flags: heron_rhi::BufferCreationFlags::empty(),
            ownership: ResourceOwnership::Internal,
            gpu_region: GpuMemoryRegion::default(),
            barrier: BufferBarrierState::default(),
        }
    }
}

pub(crate) struct Texture2DRunData {
    pub pinned_allocation: GpuAllocation,

    pub rhi_texture: heron_rhi::Texture2D,
    pub view: heron_rhi::Texture2DView,
    pub rw_views: [heron_rhi::RWTexture2DView; MAX_RW_VIEWS],

    pub rtv: heron_rhi::RenderTargetView,
    pub dsv: heron_rhi::DepthStencilView,

    pub clear_value: ClearValue,

    pub resource_access_mask: PassAccessMask,
    pub view_access_mask: PassAccessMask,
    pub rw_view_access_mask: PassAccessMask,
}

impl Default for Texture2DRunData {
    fn default() -> Self {
        Self {
            pinned_allocation: GpuAllocation::INVALID,
            rhi_texture: heron_rhi::Texture2D::INVALID,
            view: heron_rhi::Texture2DView::INVALID,
            rw_views: [heron_rhi::RWTexture2DView::INVALID; MAX_RW_VIEWS],
            rtv: heron_rhi::RenderTargetView::INVALID,
            dsv: heron_rhi::DepthStencilView::INVALID,
            clear_value: ClearValue::default(),
            resource_access_mask: PassAccessMask::default(),
            view_access_mask: PassAccessMask::default(),
            rw_view_access_mask: PassAccessMask::default(),
        }
    }
}

pub(crate) struct Texture3DRunData {
    pub pinned_allocation: GpuAllocation,

    pub rhi_texture: heron_rhi::Texture3D,
    pub view: heron_rhi::Texture3DView,
    pub rw_views: [heron_rhi::RWTexture3DView; MAX_RW_VIEWS],

    pub resource_access_mask: PassAccessMask,
    pub view_access_mask: PassAccessMask,
    pub rw_view_access_mask: PassAccessMask,
}

impl Default for Texture3DRunData {
    fn default() -> Self {
        Self {
            pinned_allocation: GpuAllocation::INVALID,
            rhi_texture: heron_rhi::Texture3D::INVALID,
            view: heron_rhi::Texture3DView::INVALID,
            rw_views: [heron_rhi::RWTexture3DView::INVALID; MAX_RW_VIEWS],
            resource_access_mask: PassAccessMask::default(),
            view_access_mask: PassAccessMask::default(),
            rw_view_access_mask: PassAccessMask::default(),
        }
    }
}

pub(crate) struct BufferRunData {
    pub pinned_allocation: GpuAllocation,

    pub buffer: BufferRegion,
    pub view: heron_rhi::BufferView,
    pub typed_view: heron_rhi::TypedBufferView,
    pub uniform_view: heron_rhi::UniformBufferView,
    pub rw_view: heron_rhi::RWBufferView,

    pub resource_access_mask: PassAccessMask,
    pub view_access_mask: PassAccessMask,
    pub typed_view_access_mask: PassAccessMask,
    pub uniform_view_access_mask: PassAccessMask,
    pub rw_view_access_mask: PassAccessMask,
}

impl Default for BufferRunData {
    fn default() -> Self {
        Self {
            pinned_allocation: GpuAllocation::INVALID,
            buffer: BufferRegion::default(),
            view: heron_rhi::BufferView::INVALID,
            typed_view: heron_rhi::TypedBufferView::INVALID,
            uniform_view: heron_rhi::UniformBufferView::INVALID,
            rw_view: heron_rhi::RWBufferView::INVALID,
            resource_access_mask: PassAccessMask::default(),
            view_access_mask: PassAccessMask::default(),
            typed_view_access_mask: PassAccessMask::default(),
            uniform_view_access_mask: PassAccessMask::default(),
            rw_view_access_mask: PassAccessMask::default(),
        }
    }
}

pub(crate) type Texture2DPool = ObjectPool<Texture2D, Texture2DRunData, Texture2DBuildData>;
pub(crate) type Texture3DPool = ObjectPool<Texture3D, Texture3DRunData, Texture3DBuildData>;
pub(crate) type BufferPool = ObjectPool<Buffer, BufferRunData, BufferBuildData>;

/// Read-only view over the three resource pools, handed to pass contexts.
pub(crate) struct RenderGraphResources<'a> {
    pub texture_2ds: &'a Texture2DPool,
    pub texture_3ds: &'a Texture3DPool,
    pub buffers: &'a BufferPool,
}
