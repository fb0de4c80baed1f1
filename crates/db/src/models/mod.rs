pub mod activity;
pub mod detection_log;
pub mod user;
pub mod zone;
