//! Point-in-time usage figures.

use std::fmt;

/// Snapshot of an arena's occupancy, returned by
/// [`TransientArena::usage`](crate::TransientArena::usage).
///
/// Useful for sizing: `high_water` over a representative run is the
/// smallest capacity that would not have overflowed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaUsage {
    /// Usable capacity in bytes.
    pub capacity: usize,
    /// Bytes handed out in the current epoch, including alignment padding.
    pub used: usize,
    /// Bytes still available in the current epoch.
    pub remaining: usize,
    /// Largest `used` seen at any reset or at the time of the query.
    pub high_water: usize,
    /// Current epoch (number of resets so far).
    pub epoch: u64,
}

impl ArenaUsage {
    /// Fraction of capacity in use, in `[0.0, 1.0]`. An empty arena reports 0.
    pub fn utilisation(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 / self.capacity as f64
    }
}

impl fmt::Display for ArenaUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} bytes ({:.1}%), high water {}, epoch {}",
            self.used,
            self.capacity,
            self.utilisation() * 100.0,
            self.high_water,
            self.epoch
        )
    }
}
