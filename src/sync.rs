// The cursor is the only shared mutable word; every other access is
// lane-private. Under `--cfg loom` the cursor is swapped for loom's model
// so the interleavings of fetch-add/fetch-sub can be explored.

#[cfg(not(loom))]
pub(crate) use portable_atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};
