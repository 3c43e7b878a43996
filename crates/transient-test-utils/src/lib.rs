//! Test utilities for transient arena development.
//!
//! Provides arena constructors that never abort the test process, a
//! multi-threaded allocation harness ([`hammer`]), and a disjointness
//! checker for granted ranges.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{hammer, HammerSpec};

use tracing_subscriber::EnvFilter;
use transient_arena::{Allocation, ArenaConfig, OverflowPolicy, TransientArena};

/// Label attached to arenas built by these helpers.
pub const TEST_LABEL: &str = "transient-test";

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Build an arena that returns violations instead of aborting.
///
/// # Panics
///
/// Panics if the region cannot be reserved.
pub fn propagating(requested_size: usize) -> TransientArena {
    let config = ArenaConfig::new(requested_size)
        .with_overflow_policy(OverflowPolicy::Propagate)
        .with_label(TEST_LABEL);
    match TransientArena::new(config) {
        Ok(arena) => arena,
        Err(err) => panic!("failed to build test arena: {err}"),
    }
}

/// Assert that `allocs` are pairwise disjoint and lie inside
/// `[0, capacity)`. Returns the total number of granted bytes.
///
/// # Panics
///
/// Panics with the offending pair if two ranges overlap, or with the
/// offending range if it runs past `capacity`.
pub fn assert_disjoint(allocs: &[Allocation], capacity: usize) -> usize {
    let mut sorted: Vec<&Allocation> = allocs.iter().collect();
    sorted.sort_by_key(|a| (a.offset(), a.len()));
    for pair in sorted.windows(2) {
        assert!(
            pair[0].end() <= pair[1].offset() || pair[0].is_empty() || pair[1].is_empty(),
            "overlapping allocations: {} and {}",
            pair[0],
            pair[1]
        );
    }
    for alloc in &sorted {
        assert!(
            alloc.end() <= capacity,
            "{alloc} runs past capacity {capacity}"
        );
    }
    sorted.iter().map(|a| a.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagating_arena_returns_errors() {
        let arena = propagating(1);
        assert!(arena.allocate_unaligned(arena.capacity() + 1).is_err());
        assert_eq!(arena.label(), TEST_LABEL);
    }

    #[test]
    fn disjoint_sequence_sums_lengths() {
        let arena = propagating(4096);
        let allocs: Vec<_> = (0..4)
            .map(|_| arena.allocate_unaligned(10).unwrap())
            .collect();
        assert_eq!(assert_disjoint(&allocs, arena.capacity()), 40);
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        init_test_logging();
        init_test_logging();
    }
}
