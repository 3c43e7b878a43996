//! Lock-free, fixed-capacity transient arena.
//!
//! Many short-lived, variably sized allocations are carved out of one
//! pre-reserved region by any number of concurrent callers. There is no
//! per-object free: the whole arena is reclaimed at once by a reset at an
//! epoch boundary (one processed event, one frame). This crate is the only
//! one in the workspace that contains `unsafe` code, confined to `raw.rs`
//! and `list.rs`.
//!
//! # Architecture
//!
//! ```text
//! TransientArena
//! ├── Region   (mmap'd capacity + PROT_NONE guard page)
//! ├── Cursor   (cache-padded AtomicUsize "bytes used")
//! ├── epoch    (bumped by reset; stales old handles)
//! └── OverflowPolicy (abort or propagate on caller defects)
//! ```
//!
//! # Allocation paths
//!
//! - **Aligned:** compare-and-swap retry loop; lock-free.
//! - **Unaligned:** one `fetch_add`; wait-free on success.
//! - **Tail growth:** `expand` / `resize` move the end of the most recent
//!   allocation with one compare-and-swap, and reject any other handle.
//!
//! # Failure policy
//!
//! Exceeding capacity or breaking the tail contract is a sizing or logic
//! defect in the caller. By default the arena logs the exact figures and
//! aborts; with [`OverflowPolicy::Propagate`] the same condition comes
//! back as an [`ArenaError`]. The guard page backs up the software check:
//! an access computed past the end faults instead of corrupting memory.
//!
//! Unix only.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
mod cursor;
pub mod epoch;
pub mod error;
pub mod handle;
pub mod list;
mod raw;
pub mod usage;

// Public re-exports for the primary API surface.
pub use arena::TransientArena;
pub use config::{ArenaConfig, OverflowPolicy};
pub use epoch::EpochGuard;
pub use error::ArenaError;
pub use handle::{Allocation, ArenaId};
pub use list::ArenaList;
pub use raw::page_size;
pub use usage::ArenaUsage;
