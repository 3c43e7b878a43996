//! Arena configuration parameters.

use crate::error::ArenaError;

/// What the arena does when a caller violates its contract.
///
/// Covers capacity overflow, tail-identity mismatches, and handles that
/// are stale or belong to another arena. Environmental failures at
/// construction are always returned as errors regardless of policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Log the violation with its exact figures and abort the process.
    #[default]
    Abort,
    /// Return the violation to the caller as an [`ArenaError`].
    ///
    /// The cursor is left exactly as it was before the failing call.
    Propagate,
}

/// Configuration for a [`TransientArena`](crate::TransientArena).
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Requested usable size in bytes.
    ///
    /// Rounded up to the next multiple of the platform page size. The
    /// trailing guard page is reserved in addition to this amount.
    pub requested_size: usize,

    /// Reaction to capacity and contract violations.
    ///
    /// Default: [`OverflowPolicy::Abort`].
    pub overflow_policy: OverflowPolicy,

    /// Name attached to log events emitted by this arena.
    pub label: &'static str,
}

impl ArenaConfig {
    /// Default requested size: 16 MiB.
    pub const DEFAULT_REQUESTED_SIZE: usize = 16 * 1024 * 1024;

    /// Largest accepted request.
    ///
    /// Keeps cursor arithmetic, including the transient overshoot of a
    /// rejected unaligned allocation, well clear of `usize` wrap-around.
    pub const MAX_REQUESTED_SIZE: usize = isize::MAX as usize / 4;

    /// Default label for log events.
    pub const DEFAULT_LABEL: &'static str = "transient";

    /// Create a config for the given requested size with the aborting policy.
    pub fn new(requested_size: usize) -> Self {
        Self {
            requested_size,
            overflow_policy: OverflowPolicy::default(),
            label: Self::DEFAULT_LABEL,
        }
    }

    /// Replace the overflow policy.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Replace the log label.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Check the config before any memory is reserved.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.requested_size > Self::MAX_REQUESTED_SIZE {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "requested size {} exceeds maximum {}",
                    self.requested_size,
                    Self::MAX_REQUESTED_SIZE
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REQUESTED_SIZE)
    }
}
