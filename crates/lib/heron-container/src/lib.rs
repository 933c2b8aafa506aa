pub mod handle;
pub mod index_alloc;
pub mod object_pool;
pub mod bump_alloc;

pub use handle::Handle;
pub use index_alloc::{IndexAllocator, INVALID_INDEX};
pub use object_pool::ObjectPool;
pub use bump_alloc::{BumpAllocator, ScratchSlice};
