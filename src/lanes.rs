//! Hosted parallel execution: one OS thread per lane.

use std::thread;

/// Runs `kernel(lane)` for every lane in `0..lanes`, each on its own thread,
/// and returns once all of them have finished.
///
/// The return is a full barrier: everything a lane did happens-before the
/// code that follows the call. Two calls in a row therefore form two
/// separate phases over the same stack.
///
/// A panicking lane makes this function panic after the others are joined.
pub fn parallel_for<F>(lanes: usize, kernel: F)
where
    F: Fn(usize) + Sync,
{
    tracing::trace!(lanes, "launching lanes");
    thread::scope(|scope| {
        for lane in 0..lanes {
            let kernel = &kernel;
            scope.spawn(move || kernel(lane));
        }
    });
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn every_lane_runs_once() {
        let seen = Mutex::new(Vec::new());
        parallel_for(12, |lane| seen.lock().unwrap().push(lane));
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn return_is_a_barrier() {
        let counter = AtomicUsize::new(0);
        parallel_for(8, |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 8);
        parallel_for(0, |_| unreachable!());
    }

    #[test]
    #[should_panic]
    fn lane_panic_propagates() {
        parallel_for(4, |lane| assert_ne!(lane, 2));
    }
}
