//! Exhaustive interleavings of the cursor under loom.
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --test loom --release
//! ```

#![cfg(loom)]

use lane_stack::AtomicCursorStack;
use loom::sync::Arc;
use loom::thread;

#[test]
fn loom_concurrent_pushes_claim_distinct_slots() {
    loom::model(|| {
        let stack = Arc::new(AtomicCursorStack::<usize>::new(3).unwrap());

        let handles: Vec<_> = (0..3)
            .map(|lane| {
                let stack = stack.clone();
                thread::spawn(move || unsafe { stack.push(lane) })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut stack = Arc::try_unwrap(stack).unwrap();
        let mut values: Vec<usize> = stack.drain().collect();
        values.sort_unstable();
        assert_eq!(values, [0, 1, 2]);
    });
}

#[test]
fn loom_concurrent_pops_take_each_value_once() {
    loom::model(|| {
        let stack = AtomicCursorStack::<usize>::new(2).unwrap();
        unsafe {
            stack.push(10);
            stack.push(20);
        }
        let stack = Arc::new(stack);

        let other = stack.clone();
        let h = thread::spawn(move || unsafe { other.pop() });
        let mine = unsafe { stack.pop() };
        let theirs = h.join().unwrap();

        assert!(stack.is_empty());
        let mut values = [mine, theirs];
        values.sort_unstable();
        assert_eq!(values, [10, 20]);
    });
}
