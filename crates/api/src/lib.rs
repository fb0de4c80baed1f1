//! CrowdCount API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! session store, detector client) so integration tests and the binary
//! entrypoint can both access them.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod detector;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod session_store;
pub mod state;
