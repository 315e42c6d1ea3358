use super::AtomicCursorStack;
use crate::memory_allocation::{Allocator, HostAllocator};
use crate::sync::Ordering;
use core::fmt;

/// A push that found no free slot. The rejected value is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError<T> {
    Full(T),
}

impl<T> CapacityError<T> {
    pub fn into_inner(self) -> T {
        match self {
            CapacityError::Full(value) => value,
        }
    }
}

impl<T> fmt::Display for CapacityError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("atomic cursor stack is full")
    }
}

impl<T: fmt::Debug> core::error::Error for CapacityError<T> {}

/// One push phase over a stack. Shared by reference between lanes.
///
/// Each push is still a single relaxed fetch-add; the index it returns is
/// checked against the capacity afterwards. Pushes that land past the end
/// leave the cursor overshooting, which is repaired when the phase ends.
pub struct PushPhase<'a, T, A: Allocator = HostAllocator> {
    stack: &'a mut AtomicCursorStack<T, A>,
}

impl<'a, T, A: Allocator> PushPhase<'a, T, A> {
    pub(super) fn new(stack: &'a mut AtomicCursorStack<T, A>) -> Self {
        Self { stack }
    }

    pub fn push(&self, value: T) -> Result<(), CapacityError<T>> {
        let old = self.stack.cursor.fetch_add(1, Ordering::Relaxed);
        if old >= self.stack.capacity {
            return Err(CapacityError::Full(value));
        }
        // SAFETY: `old` is in range and was handed to this lane only; the
        // phase borrows the stack mutably so no pop can run.
        unsafe { self.stack.slot(old).write(value) };
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.stack.capacity
    }
}

impl<T, A: Allocator> Drop for PushPhase<'_, T, A> {
    fn drop(&mut self) {
        let cursor = self.stack.len();
        if cursor > self.stack.capacity {
            tracing::debug!(
                overshoot = cursor - self.stack.capacity,
                "push phase ended with rejected pushes"
            );
            self.stack.set_len(self.stack.capacity);
        }
    }
}

/// One pop phase over a stack. Shared by reference between lanes.
///
/// Each pop is one relaxed fetch-sub on the `usize` cursor. Pops that find
/// the stack empty make it wrap past zero, so a returned index of 0 or one
/// above `capacity` both read as "empty"; the phase puts the cursor back to
/// zero when it ends.
pub struct PopPhase<'a, T, A: Allocator = HostAllocator> {
    stack: &'a mut AtomicCursorStack<T, A>,
}

impl<'a, T, A: Allocator> PopPhase<'a, T, A> {
    pub(super) fn new(stack: &'a mut AtomicCursorStack<T, A>) -> Self {
        Self { stack }
    }

    pub fn pop(&self) -> Option<T> {
        let old = self.stack.cursor.fetch_sub(1, Ordering::Relaxed);
        if old == 0 || old > self.stack.capacity {
            return None;
        }
        // SAFETY: slot `old - 1` holds a value pushed in an earlier phase and
        // was handed to this lane only.
        Some(unsafe { self.stack.slot(old - 1).read() })
    }
}

impl<T, A: Allocator> Drop for PopPhase<'_, T, A> {
    fn drop(&mut self) {
        if self.stack.len() > self.stack.capacity {
            self.stack.set_len(0);
        }
    }
}
