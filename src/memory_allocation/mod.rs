//! Backing memory for stack buffers.
//!
//! A buffer must be reachable from the controlling context and from every
//! lane for the whole life of its stack. [`HostAllocator`] serves it from
//! the process heap; [`MemoryPool`] serves it from a fixed `static` region,
//! which is what bare-metal targets without a heap use.

pub mod allocator;

pub use allocator::host_allocator::HostAllocator;
pub use allocator::memory_pool_allocator::MemoryPool;
pub use allocator::{AllocationError, AllocationResult, Allocator, FreeError, FreeResult};
