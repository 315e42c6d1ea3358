//! Bounded LIFO buffer shared by many lanes through a single atomic cursor.
//!
//! The cursor holds the index of the first free slot. A push claims a slot
//! with one fetch-add and a pop releases one with one fetch-sub; the index
//! returned by that instruction is private to the calling lane, so the slot
//! read or write that follows needs no further coordination.
//!
//! This only works while every lane moves the cursor in the same direction.
//! Lanes may push concurrently, or pop concurrently, but a push racing a pop
//! can hand the same slot to both. Work therefore runs in phases separated by
//! a barrier that the caller provides (see [`crate::lanes::parallel_for`] on
//! hosted targets).
//!
//! Two ways in:
//! - [`AtomicCursorStack::push`] / [`AtomicCursorStack::pop`] are the bare
//!   single-instruction paths. They are `unsafe`: capacity sizing, the
//!   non-empty precondition and phase separation are all on the caller.
//! - [`AtomicCursorStack::push_phase`] / [`AtomicCursorStack::pop_phase`]
//!   borrow the stack mutably for one phase and range-check the index the
//!   atomic returned.

mod phase;

pub use phase::{CapacityError, PopPhase, PushPhase};

use crate::memory_allocation::{AllocationError, Allocator, HostAllocator};
use crate::sync::{AtomicUsize, Ordering};
use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};

pub struct AtomicCursorStack<T, A: Allocator = HostAllocator> {
    buffer: NonNull<T>,
    capacity: usize,
    cursor: AtomicUsize,
    layout: Layout,
    allocator: A,
}

// SAFETY: the stack owns its values; moving it moves them.
unsafe impl<T: Send, A: Allocator + Send> Send for AtomicCursorStack<T, A> {}

// SAFETY: lanes only reach the buffer through indices handed out by the
// cursor, and each index goes to exactly one lane per phase.
unsafe impl<T: Send, A: Allocator + Sync> Sync for AtomicCursorStack<T, A> {}

impl<T> AtomicCursorStack<T> {
    /// Allocates `capacity` slots on the host heap.
    pub fn new(capacity: usize) -> Result<Self, AllocationError> {
        Self::new_in(capacity, HostAllocator)
    }
}

impl<T, A: Allocator> AtomicCursorStack<T, A> {
    /// Allocates `capacity` slots from `allocator` and starts empty.
    ///
    /// A zero `capacity` or a zero-sized `T` is a null allocation.
    pub fn new_in(capacity: usize, allocator: A) -> Result<Self, AllocationError> {
        let layout = Layout::array::<T>(capacity).map_err(|_| AllocationError::LayoutOverflow)?;
        let buffer = allocator.allocate(layout)?.cast::<T>();
        tracing::debug!(
            capacity,
            slot_size = core::mem::size_of::<T>(),
            "stack constructed"
        );
        Ok(Self {
            buffer,
            capacity,
            cursor: AtomicUsize::new(0),
            layout,
            allocator,
        })
    }

    /// Claims the next free slot and writes `value` into it.
    ///
    /// # Safety
    /// - the capacity must cover every push of the current phase: the cursor
    ///   must be below `capacity()` at each fetch-add
    /// - no lane may call `pop` until every push of this phase has returned
    ///   and a barrier has been crossed
    #[inline]
    pub unsafe fn push(&self, value: T) {
        let old = self.cursor.fetch_add(1, Ordering::Relaxed);
        debug_assert!(
            old < self.capacity,
            "push past capacity {} of an atomic cursor stack",
            self.capacity
        );
        self.slot(old).write(value);
    }

    /// Releases the top slot and moves its value out.
    ///
    /// # Safety
    /// - the stack must hold at least one value per concurrent popper
    /// - no lane may call `push` until every pop of this phase has returned
    ///   and a barrier has been crossed
    #[inline]
    pub unsafe fn pop(&self) -> T {
        let old = self.cursor.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(old > 0, "pop from an empty atomic cursor stack");
        self.slot(old.wrapping_sub(1)).read()
    }

    /// Best effort; only meaningful once every lane has been synchronized.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.load(Ordering::Relaxed) == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cursor.load(Ordering::Relaxed) == self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Opens a push phase. Lanes share the returned handle.
    pub fn push_phase(&mut self) -> PushPhase<'_, T, A> {
        self.repair_cursor();
        PushPhase::new(self)
    }

    /// Opens a pop phase. Lanes share the returned handle.
    pub fn pop_phase(&mut self) -> PopPhase<'_, T, A> {
        self.repair_cursor();
        PopPhase::new(self)
    }

    /// Pops from a single lane until the stack is empty, newest value first.
    ///
    /// Values left behind by a `Drain` dropped early stay on the stack.
    pub fn drain(&mut self) -> Drain<'_, T, A> {
        self.repair_cursor();
        Drain { stack: self }
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut T {
        // Callers pass an index obtained from the cursor.
        self.buffer.as_ptr().wrapping_add(index)
    }

    fn set_len(&mut self, len: usize) {
        self.cursor.store(len, Ordering::Relaxed);
    }

    /// A cursor past `capacity` is left behind by a phase that was forgotten
    /// instead of dropped, or by a broken push/pop contract. Which slots are
    /// live is unknown then, so the values are leaked and the stack restarts
    /// empty.
    fn repair_cursor(&mut self) {
        let len = self.len();
        if len > self.capacity {
            tracing::error!(
                cursor = len,
                capacity = self.capacity,
                "cursor outside the buffer, leaking values"
            );
            self.set_len(0);
        }
    }
}

impl<T, A: Allocator> Drop for AtomicCursorStack<T, A> {
    fn drop(&mut self) {
        self.repair_cursor();
        let len = self.len();
        // SAFETY: `&mut self` ends every phase and the cursor is within
        // `capacity`, so `[0, len)` holds live values.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.buffer.as_ptr(), len));
        }
        // SAFETY: the buffer came from this allocator with this layout.
        if let Err(err) = unsafe { self.allocator.free(self.buffer.cast(), self.layout) } {
            tracing::error!(%err, capacity = self.capacity, "failed to release stack buffer");
        } else {
            tracing::debug!(capacity = self.capacity, dropped = len, "stack released");
        }
    }
}

impl<T, A: Allocator> fmt::Debug for AtomicCursorStack<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicCursorStack")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

pub struct Drain<'a, T, A: Allocator = HostAllocator> {
    stack: &'a mut AtomicCursorStack<T, A>,
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let len = self.stack.len();
        if len == 0 {
            return None;
        }
        self.stack.set_len(len - 1);
        // SAFETY: slot `len - 1` was live and is no longer counted.
        Some(unsafe { self.stack.slot(len - 1).read() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.stack.len();
        (len, Some(len))
    }
}

impl<T, A: Allocator> ExactSizeIterator for Drain<'_, T, A> {}
