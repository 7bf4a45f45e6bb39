//! Request gateway — transport-agnostic submit/read surface over the job core.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::executor::{JobExecutor, JobFunction};
use super::log_sink::LogSink;
use super::model::{JobStatus, Outcome, RESULT_NOT_AVAILABLE, SubmitRequest};
use super::store::ResultStore;
use crate::error::GatewayError;

/// Reply to an accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitAck {
    pub status: &'static str,
    pub job_id: Uuid,
}

/// Drained log lines.
#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

/// Either a stored outcome or the "not available yet" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultBody {
    Ready(Outcome),
    NotAvailable(&'static str),
}

/// Reply to a result read.
#[derive(Debug, Clone, Serialize)]
pub struct ResultResponse {
    pub result: ResultBody,
    pub status: JobStatus,
}

/// Entry point used by the transport layer.
#[derive(Clone)]
pub struct RequestGateway {
    executor: Arc<JobExecutor>,
    store: Arc<ResultStore>,
    sink: Arc<LogSink>,
    job: Arc<dyn JobFunction>,
}

impl RequestGateway {
    pub fn new(
        executor: Arc<JobExecutor>,
        store: Arc<ResultStore>,
        sink: Arc<LogSink>,
        job: Arc<dyn JobFunction>,
    ) -> Self {
        Self {
            executor,
            store,
            sink,
            job,
        }
    }

    /// Validate a submission and hand it to the executor.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitAck, GatewayError> {
        let trip = request
            .validate()
            .map_err(|missing| GatewayError::Validation { missing })?;

        let job_id = self.executor.submit(trip, Arc::clone(&self.job)).await?;
        Ok(SubmitAck {
            status: "accepted",
            job_id,
        })
    }

    /// Drain every log line written since the previous call.
    pub fn read_logs(&self) -> LogsResponse {
        let logs = self.sink.drain_all();
        if !logs.is_empty() {
            debug!(count = logs.len(), "Drained job logs");
        }
        LogsResponse { logs }
    }

    /// Look up the outcome for the key built from `request`.
    ///
    /// Incomplete requests can never match a stored key and read as unknown.
    pub async fn read_result(&self, request: &SubmitRequest) -> ResultResponse {
        let Ok(trip) = request.validate() else {
            return ResultResponse {
                result: ResultBody::NotAvailable(RESULT_NOT_AVAILABLE),
                status: JobStatus::Unknown,
            };
        };

        let key = trip.key();
        let (status, outcome) = self.store.lookup(&key).await;
        info!(key = %key, status = %status, "Result lookup");

        ResultResponse {
            result: outcome
                .map(ResultBody::Ready)
                .unwrap_or(ResultBody::NotAvailable(RESULT_NOT_AVAILABLE)),
            status,
        }
    }

    pub fn executor(&self) -> &Arc<JobExecutor> {
        &self.executor
    }
}
