use super::super::{AllocationError, AllocationResult, Allocator, FreeError, FreeResult};
use core::alloc::Layout;
use core::cell::{Cell, UnsafeCell};
use core::ptr::NonNull;
use critical_section::Mutex;

const NEXT_BLOCK_NONE: usize = usize::MAX;
const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Fixed region of `WORDS` machine words cut into equally sized blocks.
///
/// Free blocks are chained through their first word; the chain head is the
/// only state touched under a critical section. Allocated blocks belong to
/// whoever holds the pointer and are never read by the pool.
pub struct MemoryPool<const WORDS: usize> {
    words: UnsafeCell<[usize; WORDS]>,
    words_per_block: usize,
    free_head: Mutex<Cell<usize>>,
}

// SAFETY: free blocks are only accessed inside a critical section and an
// allocated block is only reachable through the pointer handed out for it.
unsafe impl<const WORDS: usize> Sync for MemoryPool<WORDS> {}

impl<const WORDS: usize> MemoryPool<WORDS> {
    pub const fn new(words_per_block: usize) -> MemoryPool<WORDS> {
        assert!(words_per_block > 0, "Block size cannot be null");
        assert!(WORDS > 0, "Pool length cannot be null");
        assert!(
            WORDS % words_per_block == 0,
            "Pool length must be a multiple of block size"
        );

        let block_count = WORDS / words_per_block;
        let mut words = [0; WORDS];
        let mut block = 0;
        while block < block_count {
            words[block * words_per_block] = if block + 1 == block_count {
                NEXT_BLOCK_NONE
            } else {
                block + 1
            };
            block += 1;
        }

        MemoryPool {
            words: UnsafeCell::new(words),
            words_per_block,
            free_head: Mutex::new(Cell::new(0)),
        }
    }

    pub const fn block_size(&self) -> usize {
        self.words_per_block * WORD_SIZE
    }

    pub const fn block_count(&self) -> usize {
        WORDS / self.words_per_block
    }

    pub fn free_blocks(&self) -> usize {
        critical_section::with(|cs| {
            let mut count = 0;
            let mut block = self.free_head.borrow(cs).get();
            while block != NEXT_BLOCK_NONE {
                count += 1;
                // SAFETY: `block` is on the free chain, so its first word is a link.
                block = unsafe { self.block_ptr(block).read() };
            }
            count
        })
    }

    fn base(&self) -> *mut usize {
        self.words.get().cast::<usize>()
    }

    /// # Safety
    /// `block` must be lower than `block_count()`.
    unsafe fn block_ptr(&self, block: usize) -> *mut usize {
        self.base().add(block * self.words_per_block)
    }

    fn block_index(&self, ptr: NonNull<u8>) -> Result<usize, FreeError> {
        let start = self.base() as usize;
        let address = ptr.as_ptr() as usize;
        if address < start || address >= start + WORDS * WORD_SIZE {
            return Err(FreeError::OutOfRangeAddress);
        }
        let offset = address - start;
        if offset % self.block_size() != 0 {
            return Err(FreeError::UnalignedAddress);
        }
        Ok(offset / self.block_size())
    }
}

impl<const WORDS: usize> MemoryPool<WORDS> {
    pub fn allocate(&self, layout: Layout) -> AllocationResult {
        if layout.size() == 0 {
            return Err(AllocationError::NullAllocation);
        }
        if layout.size() > self.block_size() || layout.align() > core::mem::align_of::<usize>() {
            tracing::warn!(
                size = layout.size(),
                align = layout.align(),
                block_size = self.block_size(),
                "layout does not fit a pool block"
            );
            return Err(AllocationError::NoSlotLargeEnough {
                size: layout.size(),
                align: layout.align(),
            });
        }

        let block = critical_section::with(|cs| {
            let head = self.free_head.borrow(cs);
            let block = head.get();
            if block == NEXT_BLOCK_NONE {
                return None;
            }
            // SAFETY: `block` heads the free chain.
            head.set(unsafe { self.block_ptr(block).read() });
            Some(block)
        });

        match block {
            // SAFETY: blocks on the chain are always in range.
            Some(block) => Ok(unsafe { NonNull::new_unchecked(self.block_ptr(block).cast::<u8>()) }),
            None => {
                tracing::warn!(block_count = self.block_count(), "memory pool exhausted");
                Err(AllocationError::NoMemoryAvailable)
            }
        }
    }

    /// # Safety
    /// `ptr` must come from `allocate` on this pool and must not be used afterwards.
    pub unsafe fn free(&self, ptr: NonNull<u8>) -> FreeResult {
        let block = self.block_index(ptr)?;
        critical_section::with(|cs| {
            let head = self.free_head.borrow(cs);
            // SAFETY: `block` was range-checked and its owner gave it back.
            unsafe { self.block_ptr(block).write(head.get()) };
            head.set(block);
        });
        Ok(())
    }
}

// Blocks live inside the pool, so only a borrowed pool may back a stack:
// moving a pool would move every buffer it handed out.
impl<const WORDS: usize> Allocator for &MemoryPool<WORDS> {
    fn allocate(&self, layout: Layout) -> AllocationResult {
        MemoryPool::<WORDS>::allocate(self, layout)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, _layout: Layout) -> FreeResult {
        MemoryPool::<WORDS>::free(self, ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL0_WORDS_PER_BLOCK: usize = 1;
    const POOL0_BLOCKS_PER_POOL: usize = 2;
    const POOL0_WORDS_PER_POOL: usize = POOL0_BLOCKS_PER_POOL * POOL0_WORDS_PER_BLOCK;

    #[test]
    fn mem_pool_test_0() {
        let pool0 = MemoryPool::<POOL0_WORDS_PER_POOL>::new(POOL0_WORDS_PER_BLOCK);
        let layout = Layout::new::<usize>();
        assert_eq!(pool0.free_blocks(), POOL0_BLOCKS_PER_POOL);

        unsafe {
            let res0 = pool0.allocate(layout).unwrap();
            res0.cast::<usize>().as_ptr().write(usize::MAX);

            let res1 = pool0.allocate(layout).unwrap();
            res1.cast::<usize>().as_ptr().write(usize::MIN);

            assert_eq!(pool0.allocate(layout), Err(AllocationError::NoMemoryAvailable));
            assert_eq!(pool0.free_blocks(), 0);

            assert_eq!(res0.cast::<usize>().as_ptr().read(), usize::MAX);
            assert_eq!(res1.cast::<usize>().as_ptr().read(), usize::MIN);

            assert_eq!(pool0.free(res1), Ok(()));
            assert_eq!(res0.cast::<usize>().as_ptr().read(), usize::MAX);

            // The chain starts at block 0, so `res0` sits at the start of the region.
            assert_eq!(res0.as_ptr() as usize, pool0.base() as usize);
            let below = NonNull::new_unchecked(res0.as_ptr().wrapping_sub(WORD_SIZE));
            assert_eq!(pool0.free(below), Err(FreeError::OutOfRangeAddress));

            let unaligned = NonNull::new_unchecked(res0.as_ptr().add(1));
            assert_eq!(pool0.free(unaligned), Err(FreeError::UnalignedAddress));

            assert_eq!(pool0.free(res0), Ok(()));
        }
        assert_eq!(pool0.free_blocks(), POOL0_BLOCKS_PER_POOL);
    }

    #[test]
    fn mem_pool_rejects_layouts_it_cannot_serve() {
        let pool0 = MemoryPool::<POOL0_WORDS_PER_POOL>::new(POOL0_WORDS_PER_BLOCK);
        assert_eq!(
            pool0.allocate(Layout::new::<()>()),
            Err(AllocationError::NullAllocation)
        );
        assert_eq!(
            pool0.allocate(Layout::new::<[usize; 2]>()),
            Err(AllocationError::NoSlotLargeEnough {
                size: 2 * WORD_SIZE,
                align: core::mem::align_of::<usize>()
            })
        );

        #[allow(dead_code)]
        #[repr(align(64))]
        struct Wide(u8);
        let wide = Layout::new::<Wide>();
        assert!(matches!(
            MemoryPool::<8>::new(8).allocate(wide),
            Err(AllocationError::NoSlotLargeEnough { align: 64, .. })
        ));
    }

    #[test]
    fn mem_pool_reuses_freed_blocks() {
        static POOL: MemoryPool<12> = MemoryPool::new(4);
        let layout = Layout::array::<u32>(4).unwrap();
        assert_eq!(POOL.block_count(), 3);

        for _ in 0..4 {
            let blocks = [
                POOL.allocate(layout).unwrap(),
                POOL.allocate(layout).unwrap(),
                POOL.allocate(layout).unwrap(),
            ];
            assert_eq!(POOL.allocate(layout), Err(AllocationError::NoMemoryAvailable));
            for block in blocks {
                unsafe { POOL.free(block).unwrap() };
            }
        }
        assert_eq!(POOL.free_blocks(), 3);
    }
}
