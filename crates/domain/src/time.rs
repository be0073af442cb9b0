//! Time and timestamp helpers.

use chrono::{DateTime, SubsecRound, Utc};

/// UTC timestamp used for creation times and due occurrences.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time, truncated to the precision the store keeps.
#[must_use]
pub fn now() -> Timestamp {
    truncate(Utc::now())
}

/// Drop sub-microsecond digits so a timestamp survives a storage roundtrip
/// unchanged.
#[must_use]
pub fn truncate(ts: Timestamp) -> Timestamp {
    ts.trunc_subsecs(6)
}
