pub mod host_allocator;
pub mod memory_pool_allocator;

use core::alloc::Layout;
use core::ptr::NonNull;

pub type AllocationResult = Result<NonNull<u8>, AllocationError>;
pub type FreeResult = Result<(), FreeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("zero-sized allocation requested")]
    NullAllocation,
    #[error("requested layout overflows the address space")]
    LayoutOverflow,
    #[error("no memory available in the region")]
    NoMemoryAvailable,
    #[error("no slot large enough for {size} bytes aligned to {align}")]
    NoSlotLargeEnough { size: usize, align: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FreeError {
    #[error("address does not belong to the region")]
    OutOfRangeAddress,
    #[error("address is not the start of an allocated block")]
    UnalignedAddress,
}

/// A region of memory visible to the controlling context and to every lane.
///
/// A stack calls [`allocate`](Allocator::allocate) once when it is
/// constructed and [`free`](Allocator::free) once when it is dropped. The
/// memory handed out must stay where it is when the allocator value moves.
pub trait Allocator {
    fn allocate(&self, layout: Layout) -> AllocationResult;

    /// # Safety
    /// - `ptr` must have been returned by `allocate` on this allocator with the same `layout`
    /// - `ptr` must not be freed twice
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) -> FreeResult;
}

impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, layout: Layout) -> AllocationResult {
        A::allocate(self, layout)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) -> FreeResult {
        A::free(self, ptr, layout)
    }
}
