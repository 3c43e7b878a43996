//! Integration test: many threads allocating from one arena.
//!
//! N threads × M allocations of S bytes must yield N·M pairwise disjoint
//! ranges, and the cursor must account for every granted byte.

use std::collections::HashSet;

use transient_arena::ArenaError;
use transient_test_utils::{assert_disjoint, hammer, init_test_logging, propagating, HammerSpec};

#[test]
fn unaligned_threads_lose_no_bytes() {
    init_test_logging();
    let spec = HammerSpec::unaligned(8, 500, 24);
    let arena = propagating(spec.total() * spec.size);
    let allocs = hammer(&arena, spec).unwrap();
    assert_eq!(allocs.len(), spec.total());
    let granted = assert_disjoint(&allocs, arena.capacity());
    assert_eq!(granted, spec.total() * spec.size);
    assert_eq!(arena.used(), granted);
}

#[test]
fn aligned_threads_stay_aligned_and_disjoint() {
    let spec = HammerSpec::aligned(8, 500, 24, 16);
    // 24 bytes aligned to 16 consume at most 32 each.
    let arena = propagating(spec.total() * 32);
    let allocs = hammer(&arena, spec).unwrap();
    assert_eq!(allocs.len(), spec.total());
    for alloc in &allocs {
        assert_eq!((arena.base_addr() + alloc.offset()) % 16, 0);
    }
    assert_disjoint(&allocs, arena.capacity());
    // Every allocation is 16-aligned and 24 long, so padding is exactly 8
    // between neighbours; the last one carries none.
    assert_eq!(arena.used(), spec.total() * 32 - 8);
}

#[test]
fn offsets_are_unique_across_threads() {
    let spec = HammerSpec::unaligned(16, 200, 8);
    let arena = propagating(spec.total() * spec.size);
    let allocs = hammer(&arena, spec).unwrap();
    let offsets: HashSet<usize> = allocs.iter().map(|a| a.offset()).collect();
    assert_eq!(offsets.len(), spec.total());
}

#[test]
fn concurrent_overflow_never_leaves_cursor_past_capacity() {
    let arena = propagating(4096);
    let spec = HammerSpec::unaligned(8, 200, 16);
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::scope(|s| {
        for _ in 0..spec.threads {
            let tx = tx.clone();
            let arena = &arena;
            s.spawn(move || {
                for _ in 0..spec.per_thread {
                    tx.send(arena.allocate_unaligned(spec.size)).unwrap();
                }
            });
        }
    });
    drop(tx);

    let mut granted = Vec::new();
    let mut rejected = 0;
    for result in rx {
        match result {
            Ok(alloc) => granted.push(alloc),
            Err(ArenaError::CapacityExceeded { requested, capacity, .. }) => {
                assert_eq!(requested, 16);
                assert_eq!(capacity, arena.capacity());
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(rejected > 0);
    assert_eq!(granted.len() + rejected, spec.total());
    let bytes = assert_disjoint(&granted, arena.capacity());
    assert_eq!(arena.used(), bytes);
    assert!(arena.used() <= arena.capacity());
}

#[test]
fn mixed_paths_share_one_cursor() {
    let arena = propagating(256 * 1024);
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::scope(|s| {
        for t in 0..8usize {
            let tx = tx.clone();
            let arena = &arena;
            s.spawn(move || {
                for i in 0..300usize {
                    let result = if (t + i) % 2 == 0 {
                        arena.allocate(8, 1 + i % 40)
                    } else {
                        arena.allocate_unaligned(1 + i % 40)
                    };
                    tx.send(result.unwrap()).unwrap();
                }
            });
        }
    });
    drop(tx);
    let allocs: Vec<_> = rx.into_iter().collect();
    assert_eq!(allocs.len(), 8 * 300);
    let granted = assert_disjoint(&allocs, arena.capacity());
    assert!(granted <= arena.used());
}
