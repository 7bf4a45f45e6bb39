//! Asynchronous job core.
//!
//! - `model` — submissions, job keys, outcomes
//! - `log_sink` — shared FIFO of job output, plus the per-job `JobLog` handle
//! - `store` — last outcome per job key
//! - `executor` — fixed worker pool over a bounded queue
//! - `gateway` — submit / read surface used by the HTTP routes

pub mod executor;
pub mod gateway;
pub mod log_sink;
pub mod model;
pub mod store;

pub use executor::{JobExecutor, JobFunction};
pub use gateway::{LogsResponse, RequestGateway, ResultBody, ResultResponse, SubmitAck};
pub use log_sink::{JobLog, LogSink};
pub use model::{JobKey, JobStatus, Outcome, SubmitRequest, TripRequest};
pub use store::{ResultStore, spawn_eviction_task};
