pub mod handles;
pub mod format;
pub mod resource;
pub mod command_list;
pub mod device;
pub mod transient;
pub mod temporary;
pub mod null;

pub use handles::*;
pub use format::{bytes_per_pixel, DepthFormat, RenderTargetFormat, TextureFormat};
pub use resource::*;
pub use command_list::*;
pub use device::Device;
pub use temporary::{TemporaryBufferAllocator, MAX_FRAME_LATENCY};
pub use transient::{TransientMemoryAllocator, TRANSIENT_PAGE_SIZE};
