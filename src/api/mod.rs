//! HTTP surface.

pub mod routes;

pub use routes::{AppState, job_routes};
