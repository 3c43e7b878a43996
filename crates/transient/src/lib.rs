//! Transient: fixed-capacity, lock-free scratch memory for event loops.
//!
//! This is the top-level facade crate that re-exports the public API of
//! the workspace. For most users, adding `transient` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use transient::prelude::*;
//!
//! // The composition root owns the arena and passes it by reference.
//! let config = ArenaConfig::new(64 * 1024).with_overflow_policy(OverflowPolicy::Propagate);
//! let mut arena = TransientArena::new(config).unwrap();
//!
//! for event in 0..3u32 {
//!     let epoch = arena.begin_epoch();
//!
//!     // Producers share the epoch and allocate concurrently.
//!     std::thread::scope(|s| {
//!         for _ in 0..4 {
//!             s.spawn(|| {
//!                 let mut buf = epoch.allocate(8, 128).unwrap();
//!                 epoch.bytes_mut(&mut buf).unwrap().fill(event as u8);
//!             });
//!         }
//!     });
//!
//!     // A single owner grows a list in the arena tail.
//!     let mut ids = ArenaList::<u32>::new(&epoch);
//!     ids.extend_from_slice(&[1, 2, 3]).unwrap();
//!     ids.push(event).unwrap();
//!     assert_eq!(ids.len(), 4);
//! }
//! assert_eq!(arena.epoch(), 3);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `transient-arena` | `TransientArena`, handles, lists, epochs, errors |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Arena, allocation handles, lists, and errors (`transient-arena`).
pub use transient_arena as arena;

/// Common imports for typical usage.
///
/// ```rust
/// use transient::prelude::*;
/// ```
pub mod prelude {
    pub use transient_arena::{
        Allocation, ArenaConfig, ArenaError, ArenaList, ArenaUsage, EpochGuard, OverflowPolicy,
        TransientArena,
    };
}
