//! Domain logic for the CrowdCount people-counting service.
//!
//! Everything here is free of database and HTTP concerns. The API crate
//! owns the transport; this crate owns the frame pipeline (detection
//! filtering, identity tracking, line crossing, zone occupancy, alerts and
//! the heatmap) plus the capture sources that feed it.

pub mod alert;
pub mod annotate;
pub mod capture;
pub mod crossing;
pub mod detection;
pub mod error;
pub mod export;
pub mod frame;
pub mod geometry;
pub mod heatmap;
pub mod roles;
pub mod session;
pub mod tracker;
pub mod types;
pub mod zones;
