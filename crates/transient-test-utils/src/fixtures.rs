//! Multi-threaded allocation harness.
//!
//! [`hammer`] releases a fixed number of threads at once through a
//! barrier, lets each issue the same allocation repeatedly against a
//! shared arena, and collects every result through a channel.

use std::sync::Barrier;

use transient_arena::{Allocation, ArenaError, TransientArena};

/// Shape of a [`hammer`] run.
#[derive(Clone, Copy, Debug)]
pub struct HammerSpec {
    /// Number of allocating threads.
    pub threads: usize,
    /// Allocations issued by each thread.
    pub per_thread: usize,
    /// Bytes per allocation.
    pub size: usize,
    /// Alignment for the aligned path, or `None` for the unaligned path.
    pub align: Option<usize>,
}

impl HammerSpec {
    /// Unaligned allocations of `size` bytes.
    pub fn unaligned(threads: usize, per_thread: usize, size: usize) -> Self {
        Self {
            threads,
            per_thread,
            size,
            align: None,
        }
    }

    /// Allocations of `size` bytes aligned to `align`.
    pub fn aligned(threads: usize, per_thread: usize, size: usize, align: usize) -> Self {
        Self {
            threads,
            per_thread,
            size,
            align: Some(align),
        }
    }

    /// Total allocations the run issues.
    pub fn total(&self) -> usize {
        self.threads * self.per_thread
    }
}

/// Run `spec` against `arena` and return every granted allocation.
///
/// All threads start together. Returns the first error any thread saw.
pub fn hammer(arena: &TransientArena, spec: HammerSpec) -> Result<Vec<Allocation>, ArenaError> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let barrier = Barrier::new(spec.threads);
    std::thread::scope(|s| {
        for _ in 0..spec.threads {
            let tx = tx.clone();
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for _ in 0..spec.per_thread {
                    let result = match spec.align {
                        Some(align) => arena.allocate(align, spec.size),
                        None => arena.allocate_unaligned(spec.size),
                    };
                    if tx.send(result).is_err() {
                        return;
                    }
                }
            });
        }
    });
    drop(tx);
    rx.into_iter().collect()
}
