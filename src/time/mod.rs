//! Time windows and lead-duration helpers

mod window;

pub use window::{TimeWindow, TimeWindowBuilder};

use chrono::Duration;

use crate::types::Timestamp;

/// Lead duration of a valid time relative to a basis time
#[inline]
pub fn lead_duration(basis_time: Timestamp, valid_time: Timestamp) -> Duration {
    valid_time - basis_time
}

/// Earliest instant representable as a [`Timestamp`]
pub const UNBOUNDED_EARLIEST: Timestamp = Timestamp::MIN_UTC;

/// Latest instant representable as a [`Timestamp`]
pub const UNBOUNDED_LATEST: Timestamp = Timestamp::MAX_UTC;
