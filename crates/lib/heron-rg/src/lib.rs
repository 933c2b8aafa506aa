mod graph;
mod graph_resource;

mod build;
mod execute;

mod pass;
mod pass_context;
mod resource;

pub use graph::RenderGraph;
pub use pass::{FnExecuteRenderPass, RenderGraphExecutionFlags, RenderPassDesc, RenderPassFlags};
pub use pass_context::{PassExecutionContext, MAX_TEMP_BUFFER_COUNT};
pub use resource::*;

pub use graph_resource::{MAX_RENDER_PASS_COUNT, MAX_RW_VIEWS, MAX_VIEWPORT_STACK_SIZE};

extern crate log as glog;
