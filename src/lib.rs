#![cfg_attr(target_os = "none", no_std)]

//! A bounded LIFO buffer for data-parallel lanes, coordinated by nothing
//! but one atomic cursor.
//!
//! ```
//! use lane_stack::{lanes, AtomicCursorStack};
//!
//! let mut stack = AtomicCursorStack::<usize>::new(10)?;
//! {
//!     let phase = stack.push_phase();
//!     lanes::parallel_for(10, |lane| phase.push(lane).unwrap());
//! }
//! let mut values: Vec<usize> = stack.drain().collect();
//! values.sort_unstable();
//! assert_eq!(values, (0..10).collect::<Vec<_>>());
//! # Ok::<(), lane_stack::AllocationError>(())
//! ```

extern crate alloc;

pub mod memory_allocation;
pub mod stack;
mod sync;

#[cfg(not(target_os = "none"))]
pub mod lanes;

pub use memory_allocation::{AllocationError, Allocator, FreeError, HostAllocator, MemoryPool};
pub use stack::{AtomicCursorStack, CapacityError, Drain, PopPhase, PushPhase};
