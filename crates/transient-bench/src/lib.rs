//! Workload profiles for benchmarking the transient arena.
//!
//! Models the way an event-dispatch loop uses scratch memory: for every
//! event, several producer threads carve out randomly sized buffers in
//! parallel, then a single owner builds a growable list in the arena
//! tail, and the epoch ends with a reset.
//!
//! - [`EventProfile::reference`]: 4 producers, small buffers
//! - [`EventProfile::stress`]: 16 producers, larger buffers and lists
//! - [`run_event_profile`]: drive an arena through a profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use transient_arena::{ArenaError, ArenaList, TransientArena};

/// Alignment used for producer buffers.
pub const BUFFER_ALIGN: usize = 8;

/// Shape of a simulated event loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventProfile {
    /// Number of events (epochs) to process.
    pub events: usize,
    /// Concurrent producer threads per event.
    pub producers: usize,
    /// Buffers allocated by each producer per event.
    pub allocs_per_producer: usize,
    /// Smallest buffer in bytes.
    pub min_size: usize,
    /// Largest buffer in bytes.
    pub max_size: usize,
    /// Elements pushed onto the tail list per event.
    pub list_len: usize,
    /// Seed for buffer sizes.
    pub seed: u64,
}

impl EventProfile {
    /// Reference profile: 4 producers × 64 buffers of 16–256 bytes, a
    /// 256-element list.
    pub fn reference(seed: u64) -> Self {
        Self {
            events: 100,
            producers: 4,
            allocs_per_producer: 64,
            min_size: 16,
            max_size: 256,
            list_len: 256,
            seed,
        }
    }

    /// Stress profile: 16 producers × 256 buffers of 64–4096 bytes, a
    /// 4096-element list.
    pub fn stress(seed: u64) -> Self {
        Self {
            events: 20,
            producers: 16,
            allocs_per_producer: 256,
            min_size: 64,
            max_size: 4096,
            list_len: 4096,
            seed,
        }
    }

    /// Worst-case bytes one event can consume.
    ///
    /// Covers maximal buffers with full alignment padding plus a list that
    /// has just doubled.
    pub fn arena_size(&self) -> usize {
        let buffers = self.producers * self.allocs_per_producer * (self.max_size + BUFFER_ALIGN);
        let list = 2 * self.list_len.max(4) * std::mem::size_of::<u32>() + BUFFER_ALIGN;
        buffers + list
    }
}

/// Outcome of [`run_event_profile`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProfileReport {
    /// Events processed.
    pub events: usize,
    /// Producer buffers granted across all events.
    pub allocations: usize,
    /// Producer bytes granted across all events (excluding padding).
    pub bytes: usize,
    /// Highest arena usage at any event boundary.
    pub high_water: usize,
}

/// Drive `arena` through `profile`, one epoch per event.
pub fn run_event_profile(
    arena: &mut TransientArena,
    profile: &EventProfile,
) -> Result<ProfileReport, ArenaError> {
    let mut report = ProfileReport::default();
    for event in 0..profile.events {
        let epoch = arena.begin_epoch();
        let produced = std::thread::scope(|s| {
            let handles: Vec<_> = (0..profile.producers)
                .map(|producer| {
                    let epoch = &epoch;
                    s.spawn(move || produce(epoch, profile, event, producer))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect::<Result<Vec<_>, _>>()
        })?;
        for (count, bytes) in produced {
            report.allocations += count;
            report.bytes += bytes;
        }

        let mut list = ArenaList::<u32>::new(&epoch);
        for i in 0..profile.list_len {
            list.push(i as u32)?;
        }
        list.shrink_to_fit()?;

        report.high_water = report.high_water.max(epoch.used());
        report.events += 1;
    }
    tracing::debug!(?report, "event profile finished");
    Ok(report)
}

/// One producer's share of one event: random buffers, each filled.
fn produce(
    arena: &TransientArena,
    profile: &EventProfile,
    event: usize,
    producer: usize,
) -> Result<(usize, usize), ArenaError> {
    let mut rng = ChaCha8Rng::seed_from_u64(
        profile.seed ^ ((event as u64) << 32) ^ producer as u64,
    );
    let span = (profile.max_size - profile.min_size + 1) as u64;
    let mut bytes = 0;
    for _ in 0..profile.allocs_per_producer {
        let size = profile.min_size + (rng.next_u64() % span) as usize;
        let mut buffer = arena.allocate(BUFFER_ALIGN, size)?;
        arena.bytes_mut(&mut buffer)?.fill(producer as u8);
        bytes += size;
    }
    Ok((profile.allocs_per_producer, bytes))
}
