use super::{AllocationError, AllocationResult, Allocator, FreeResult};
use core::alloc::Layout;
use core::ptr::NonNull;

/// The global heap. Every thread of the process sees it, which is all a
/// hosted lane needs from unified memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostAllocator;

impl Allocator for HostAllocator {
    fn allocate(&self, layout: Layout) -> AllocationResult {
        if layout.size() == 0 {
            return Err(AllocationError::NullAllocation);
        }
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| {
            tracing::warn!(size = layout.size(), align = layout.align(), "host allocation failed");
            AllocationError::NoMemoryAvailable
        })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) -> FreeResult {
        alloc::alloc::dealloc(ptr.as_ptr(), layout);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_allocator_test_0() {
        let layout = Layout::array::<u64>(4).unwrap();
        let ptr = HostAllocator.allocate(layout).unwrap();
        unsafe {
            let words = ptr.cast::<u64>().as_ptr();
            for i in 0..4 {
                words.add(i).write(0xAAAA_0000 + i as u64);
            }
            assert_eq!(words.add(3).read(), 0xAAAA_0003);
            assert_eq!(HostAllocator.free(ptr, layout), Ok(()));
        }
    }

    #[test]
    fn host_allocator_rejects_null_allocation() {
        let layout = Layout::array::<u64>(0).unwrap();
        assert_eq!(HostAllocator.allocate(layout), Err(AllocationError::NullAllocation));
    }
}
