//! Handle types of the rendering hardware interface.
//!
//! View handles are slim (32-bit) because their integer value is passed
//! straight to shaders as a bindless descriptor index. Render target and
//! depth stencil views are CPU-side only and stay wide.

use heron_container::{define_handle, define_slim_handle};

define_handle!(pub struct RasterPipeline, salt = 0x01);
define_handle!(pub struct ComputePipeline, salt = 0x02);

define_handle!(pub struct GpuAllocation, salt = 0x04);
define_handle!(pub struct Texture2D, salt = 0x05);
define_handle!(pub struct Texture3D, salt = 0x06);
define_handle!(pub struct Buffer, salt = 0x07);

define_slim_handle!(pub struct Texture2DView, salt = 0x08);
define_slim_handle!(pub struct Texture3DView, salt = 0x09);
define_slim_handle!(pub struct BufferView, salt = 0x0B);
define_slim_handle!(pub struct TypedBufferView, salt = 0x0C);
define_slim_handle!(pub struct UniformBufferView, salt = 0x0D);

define_slim_handle!(pub struct RWTexture2DView, salt = 0x11);
define_slim_handle!(pub struct RWTexture3DView, salt = 0x12);
define_slim_handle!(pub struct RWBufferView, salt = 0x13);

define_handle!(pub struct RenderTargetView, salt = 0x15);
define_handle!(pub struct DepthStencilView, salt = 0x16);
