//! trip-crew — asynchronous trip research jobs with polled results and logs.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod research;
