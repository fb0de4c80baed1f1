pub mod admin;
pub mod analysis;
pub mod auth;
pub mod detections;
pub mod export;
pub mod video;
pub mod webcam;
pub mod zones;
