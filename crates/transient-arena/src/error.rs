//! Arena-specific error types.

use std::error::Error;
use std::fmt;
use std::io;

use crate::handle::ArenaId;

/// Errors that can occur during arena operations.
///
/// The first two variants are environmental or configuration failures at
/// construction time. Every other variant is a programming defect in the
/// caller (see [`ArenaError::is_violation`]) and is routed through the
/// arena's [`OverflowPolicy`](crate::config::OverflowPolicy).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The virtual memory reservation for the region failed.
    ReservationFailed {
        /// Number of bytes that were requested (capacity plus guard page).
        requested: usize,
        /// Raw OS error code reported by the failing call, if any.
        os_error: Option<i32>,
    },
    /// The arena configuration was rejected before any memory was reserved.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// Completing the call would move the cursor past the region's capacity.
    CapacityExceeded {
        /// Bytes the call would have consumed beyond `used`, including
        /// alignment padding.
        requested: usize,
        /// Cursor position observed when the call was rejected.
        used: usize,
        /// Usable capacity of the region in bytes.
        capacity: usize,
    },
    /// A tail-growth call was given an allocation that is not the current tail.
    NotTail {
        /// Where the cursor would be if the allocation were the tail.
        expected_end: usize,
        /// Where the cursor actually is.
        used: usize,
    },
    /// An [`Allocation`](crate::handle::Allocation) from before the last reset.
    StaleHandle {
        /// The epoch encoded in the handle.
        handle_epoch: u64,
        /// The arena's current epoch.
        current_epoch: u64,
    },
    /// An [`Allocation`](crate::handle::Allocation) issued by a different arena.
    ForeignHandle {
        /// Arena that issued the handle.
        handle_arena: ArenaId,
        /// Arena the handle was presented to.
        arena: ArenaId,
    },
    /// `count * elem_size` does not fit in `usize`.
    LayoutOverflow {
        /// Requested element count.
        count: usize,
        /// Size of a single element in bytes.
        elem_size: usize,
    },
}

impl ArenaError {
    /// Whether this error is a caller defect rather than an environmental
    /// failure.
    pub fn is_violation(&self) -> bool {
        !matches!(
            self,
            Self::ReservationFailed { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Bytes that were still free when a [`CapacityExceeded`](Self::CapacityExceeded)
    /// error was raised. `None` for every other variant.
    pub fn available(&self) -> Option<usize> {
        match self {
            Self::CapacityExceeded { used, capacity, .. } => Some(capacity.saturating_sub(*used)),
            _ => None,
        }
    }
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservationFailed {
                requested,
                os_error,
            } => {
                write!(f, "failed to reserve {requested} bytes for arena region")?;
                if let Some(code) = os_error {
                    write!(f, ": {}", io::Error::from_raw_os_error(*code))?;
                }
                Ok(())
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid arena config: {reason}")
            }
            Self::CapacityExceeded {
                requested,
                used,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, {} of {capacity} bytes available ({used} in use)",
                    capacity.saturating_sub(*used)
                )
            }
            Self::NotTail { expected_end, used } => {
                write!(
                    f,
                    "allocation is not the arena tail: it ends at {expected_end}, cursor is at {used}"
                )
            }
            Self::StaleHandle {
                handle_epoch,
                current_epoch,
            } => {
                write!(
                    f,
                    "stale allocation: epoch {handle_epoch}, arena is at epoch {current_epoch}"
                )
            }
            Self::ForeignHandle {
                handle_arena,
                arena,
            } => {
                write!(
                    f,
                    "allocation belongs to arena {handle_arena}, not arena {arena}"
                )
            }
            Self::LayoutOverflow { count, elem_size } => {
                write!(
                    f,
                    "list layout overflow: {count} elements of {elem_size} bytes"
                )
            }
        }
    }
}

impl Error for ArenaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_names_exact_figures() {
        let err = ArenaError::CapacityExceeded {
            requested: 12_000,
            used: 300,
            capacity: 12_288,
        };
        assert_eq!(
            err.to_string(),
            "arena capacity exceeded: requested 12000 bytes, 11988 of 12288 bytes available (300 in use)"
        );
        assert_eq!(err.available(), Some(11_988));
    }

    #[test]
    fn environmental_errors_are_not_violations() {
        let reserve = ArenaError::ReservationFailed {
            requested: 4096,
            os_error: Some(libc::ENOMEM),
        };
        assert!(!reserve.is_violation());
        assert!(reserve.to_string().starts_with("failed to reserve 4096 bytes"));
        assert!(!ArenaError::InvalidConfig {
            reason: "x".into()
        }
        .is_violation());
        assert!(ArenaError::NotTail {
            expected_end: 10,
            used: 20
        }
        .is_violation());
    }
}
