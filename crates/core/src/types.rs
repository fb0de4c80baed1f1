use std::collections::HashMap;

use indexmap::IndexMap;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Stable person identity minted by the tracker. Starts at 1.
pub type IdentityId = u64;

/// Zero-based frame index within an uploaded video.
pub type FrameNumber = u64;

/// Per-zone person counts, in the order the zones were supplied.
pub type ZoneCounts = IndexMap<String, u32>;

/// Zone name to occupancy threshold. Not tied to any existing zone.
pub type ZoneThresholds = HashMap<String, i32>;
