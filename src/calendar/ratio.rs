//! Staffing ratio policy.
//!
//! Maps age-bucketed child counts to the number of staff required to supervise
//! them.

use serde::{Deserialize, Serialize};

/// The number of present children in one age band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBandCount {
    /// The band name.
    pub band: String,
    /// Children one staff member may supervise in this band.
    pub children_per_staff: u32,
    /// Present children in the band.
    pub count: u32,
}

impl AgeBandCount {
    /// Returns the staff this band needs on its own.
    pub fn required_staff(&self) -> u32 {
        // Ratios below one are rejected at config load
        self.count.div_ceil(self.children_per_staff.max(1))
    }
}

/// Returns the total staff required for the given band counts.
///
/// Each band is rounded up on its own; remainders are never pooled across
/// bands.
///
/// # Example
///
/// ```
/// use childcare_attendance::calendar::{AgeBandCount, required_staff};
///
/// let counts = vec![
///     AgeBandCount { band: "infant".to_string(), children_per_staff: 3, count: 4 },
///     AgeBandCount { band: "toddler".to_string(), children_per_staff: 5, count: 1 },
/// ];
///
/// // ceil(4 / 3) + ceil(1 / 5) = 2 + 1
/// assert_eq!(required_staff(&counts), 3);
/// ```
pub fn required_staff(counts: &[AgeBandCount]) -> u32 {
    counts.iter().map(AgeBandCount::required_staff).sum()
}
