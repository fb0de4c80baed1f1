//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod activity_repo;
pub mod detection_log_repo;
pub mod user_repo;
pub mod zone_repo;
pub mod zone_threshold_repo;

pub use activity_repo::ActivityRepo;
pub use detection_log_repo::DetectionLogRepo;
pub use user_repo::UserRepo;
pub use zone_repo::ZoneRepo;
pub use zone_threshold_repo::ZoneThresholdRepo;
