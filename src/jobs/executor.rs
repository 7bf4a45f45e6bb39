//! Job executor — fixed worker pool over a bounded queue.
//!
//! `submit()` never waits on a job: it enqueues and returns. Workers pull
//! jobs off the shared queue, run them with an explicit [`JobLog`], and write
//! exactly one [`Outcome`] per job into the [`ResultStore`]. A job that
//! returns an error, panics, or exceeds the timeout is stored as
//! `Outcome::Error`; the worker moves on to the next job.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::log_sink::{JobLog, LogSink};
use super::model::{Outcome, TripRequest};
use super::store::ResultStore;
use crate::config::ExecutorConfig;
use crate::error::JobError;

/// The long-running work a job performs.
///
/// Implementations write progress through `log` and return the payload to
/// store. Errors and panics are converted to an error outcome by the
/// executor.
#[async_trait]
pub trait JobFunction: Send + Sync {
    /// Short name used in tracing output.
    fn name(&self) -> &str {
        "job"
    }

    async fn run(&self, request: &TripRequest, log: &JobLog) -> anyhow::Result<serde_json::Value>;
}

/// A job waiting in the queue.
struct QueuedJob {
    id: Uuid,
    request: TripRequest,
    function: Arc<dyn JobFunction>,
}

/// State shared between the executor handle and its workers.
struct Shared {
    store: Arc<ResultStore>,
    sink: Arc<LogSink>,
    job_timeout: Option<Duration>,
    queued: AtomicUsize,
    running: AtomicUsize,
}

/// Fixed-size pool of job workers.
pub struct JobExecutor {
    /// `None` once shutdown has started.
    tx: RwLock<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
    capacity: usize,
    worker_count: usize,
}

impl JobExecutor {
    /// Start the pool. Must be called from within a Tokio runtime.
    pub fn new(config: &ExecutorConfig, store: Arc<ResultStore>, sink: Arc<LogSink>) -> Arc<Self> {
        let worker_count = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel::<QueuedJob>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        let shared = Arc::new(Shared {
            store,
            sink,
            job_timeout: config.job_timeout,
            queued: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
        });

        let workers = (0..worker_count)
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let shared = Arc::clone(&shared);
                tokio::spawn(worker_loop(worker_id, rx, shared))
            })
            .collect();

        info!(
            workers = worker_count,
            queue_capacity = capacity,
            timeout = ?config.job_timeout,
            "Job executor started"
        );

        Arc::new(Self {
            tx: RwLock::new(Some(tx)),
            workers: Mutex::new(workers),
            shared,
            capacity,
            worker_count,
        })
    }

    /// Enqueue a job and return its id without waiting for it to run.
    ///
    /// Fails with [`JobError::PoolSaturated`] when the queue is full and
    /// [`JobError::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub async fn submit(
        &self,
        request: TripRequest,
        function: Arc<dyn JobFunction>,
    ) -> Result<Uuid, JobError> {
        let tx = self.tx.read().await;
        let Some(tx) = tx.as_ref() else {
            return Err(JobError::ShuttingDown);
        };

        let id = Uuid::new_v4();
        let key = request.key();
        let job_name = function.name().to_string();

        self.shared.store.mark_pending(&key).await;
        self.shared.queued.fetch_add(1, Ordering::SeqCst);

        match tx.try_send(QueuedJob {
            id,
            request,
            function,
        }) {
            Ok(()) => {
                info!(job_id = %id, key = %key, job = %job_name, "Job queued");
                Ok(id)
            }
            Err(e) => {
                self.shared.queued.fetch_sub(1, Ordering::SeqCst);
                self.shared.store.release_pending(&key).await;
                match e {
                    TrySendError::Full(_) => {
                        warn!(key = %key, capacity = self.capacity, "Job queue full, rejecting");
                        Err(JobError::PoolSaturated {
                            capacity: self.capacity,
                        })
                    }
                    TrySendError::Closed(_) => Err(JobError::ShuttingDown),
                }
            }
        }
    }

    /// Stop accepting jobs, let workers finish everything already queued,
    /// and wait for them to exit.
    pub async fn shutdown(&self) {
        let pending = self.shared.queued.load(Ordering::SeqCst);
        info!(queued = pending, "Shutting down job executor");

        // Dropping the last sender lets workers drain the queue and stop.
        self.tx.write().await.take();

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Job worker exited abnormally");
            }
        }

        info!("Job executor stopped");
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queued.load(Ordering::SeqCst)
    }

    /// Jobs currently running.
    pub fn running(&self) -> usize {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }
}

async fn worker_loop(worker_id: usize, rx: Arc<Mutex<mpsc::Receiver<QueuedJob>>>, shared: Arc<Shared>) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            break;
        };

        shared.queued.fetch_sub(1, Ordering::SeqCst);
        shared.running.fetch_add(1, Ordering::SeqCst);
        run_job(worker_id, job, &shared).await;
        shared.running.fetch_sub(1, Ordering::SeqCst);
    }

    info!(worker_id, "Job worker exiting");
}

async fn run_job(worker_id: usize, job: QueuedJob, shared: &Shared) {
    let QueuedJob {
        id,
        request,
        function,
    } = job;
    let key = request.key();
    let log = JobLog::new(id, Arc::clone(&shared.sink));
    let started = std::time::Instant::now();

    info!(job_id = %id, worker_id, key = %key, job = %function.name(), "Job started");

    // Run on its own task so a panic surfaces as a JoinError here instead of
    // unwinding through the worker.
    let task_log = log.clone();
    let mut handle = tokio::spawn(async move { function.run(&request, &task_log).await });

    let joined = match shared.job_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => Some(joined),
            Err(_) => {
                handle.abort();
                None
            }
        },
        None => Some((&mut handle).await),
    };

    let result = match joined {
        None => Err(JobError::Timeout {
            timeout: shared.job_timeout.unwrap_or_default(),
        }),
        Some(Ok(Ok(payload))) => Ok(payload),
        Some(Ok(Err(e))) => Err(JobError::Failed {
            reason: format!("{e:#}"),
        }),
        Some(Err(e)) if e.is_panic() => Err(JobError::Panicked {
            reason: panic_message(e.into_panic()),
        }),
        Some(Err(e)) => Err(JobError::Failed {
            reason: e.to_string(),
        }),
    };

    let elapsed = started.elapsed();
    let outcome = match result {
        Ok(payload) => {
            log.write(format!("Job finished for {key}"));
            info!(job_id = %id, key = %key, elapsed_ms = elapsed.as_millis() as u64, "Job completed");
            Outcome::success(payload)
        }
        Err(e) => {
            log.write(format!("Job failed for {key}: {e}"));
            warn!(job_id = %id, key = %key, elapsed_ms = elapsed.as_millis() as u64, error = %e, "Job failed");
            Outcome::error(e.to_string())
        }
    };

    shared.store.put(key, outcome).await;
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::{JobKey, JobStatus};
    use tokio::sync::Notify;

    const WAIT: Duration = Duration::from_secs(5);

    fn request(month: &str) -> TripRequest {
        TripRequest {
            category: "Beach".into(),
            budget: "20000".into(),
            num_people: "2".into(),
            trip_type: "Leisure".into(),
            month: month.into(),
        }
    }

    fn config(workers: usize, queue_capacity: usize) -> ExecutorConfig {
        ExecutorConfig {
            workers,
            queue_capacity,
            job_timeout: None,
            ..ExecutorConfig::default()
        }
    }

    async fn wait_for(store: &ResultStore, key: &JobKey) -> Outcome {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(outcome) = store.get(key).await {
                    return outcome;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job did not complete in time")
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        tokio::time::timeout(WAIT, async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    struct EchoJob;

    #[async_trait]
    impl JobFunction for EchoJob {
        async fn run(&self, request: &TripRequest, log: &JobLog) -> anyhow::Result<serde_json::Value> {
            log.write(format!("planning {}", request.month));
            Ok(serde_json::json!({ "month": request.month }))
        }
    }

    struct FailingJob;

    #[async_trait]
    impl JobFunction for FailingJob {
        async fn run(&self, _request: &TripRequest, _log: &JobLog) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("search provider unavailable")
        }
    }

    struct PanickingJob;

    #[async_trait]
    impl JobFunction for PanickingJob {
        async fn run(&self, _request: &TripRequest, _log: &JobLog) -> anyhow::Result<serde_json::Value> {
            panic!("crew exploded");
        }
    }

    struct SleepyJob;

    #[async_trait]
    impl JobFunction for SleepyJob {
        async fn run(&self, _request: &TripRequest, _log: &JobLog) -> anyhow::Result<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(serde_json::Value::Null)
        }
    }

    /// Blocks until its gate is opened, then returns `payload`.
    struct GatedJob {
        gate: Arc<Notify>,
        payload: &'static str,
    }

    #[async_trait]
    impl JobFunction for GatedJob {
        async fn run(&self, _request: &TripRequest, _log: &JobLog) -> anyhow::Result<serde_json::Value> {
            self.gate.notified().await;
            Ok(serde_json::json!(self.payload))
        }
    }

    #[tokio::test]
    async fn submit_runs_job_and_stores_success() {
        let store = ResultStore::new();
        let sink = LogSink::new();
        let executor = JobExecutor::new(&config(2, 8), Arc::clone(&store), Arc::clone(&sink));

        let req = request("December");
        executor.submit(req.clone(), Arc::new(EchoJob)).await.unwrap();

        let outcome = wait_for(&store, &req.key()).await;
        assert_eq!(outcome, Outcome::success(serde_json::json!({"month": "December"})));

        let logs = sink.drain_all();
        assert_eq!(logs.first().map(String::as_str), Some("planning December"));
        assert!(logs.last().unwrap().starts_with("Job finished"));
    }

    #[tokio::test]
    async fn failed_job_is_stored_and_pool_keeps_working() {
        let store = ResultStore::new();
        let executor = JobExecutor::new(&config(1, 8), Arc::clone(&store), LogSink::new());

        let bad = request("June");
        let good = request("July");
        executor.submit(bad.clone(), Arc::new(FailingJob)).await.unwrap();
        executor.submit(good.clone(), Arc::new(EchoJob)).await.unwrap();

        match wait_for(&store, &bad.key()).await {
            Outcome::Error { message } => assert!(message.contains("search provider unavailable")),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(wait_for(&store, &good.key()).await.is_success());
    }

    #[tokio::test]
    async fn panicking_job_does_not_poison_pool() {
        let store = ResultStore::new();
        let executor = JobExecutor::new(&config(1, 8), Arc::clone(&store), LogSink::new());

        let boom = request("March");
        let after = request("April");
        executor.submit(boom.clone(), Arc::new(PanickingJob)).await.unwrap();
        executor.submit(after.clone(), Arc::new(EchoJob)).await.unwrap();

        match wait_for(&store, &boom.key()).await {
            Outcome::Error { message } => assert!(message.contains("crew exploded")),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(wait_for(&store, &after.key()).await.is_success());
    }

    #[tokio::test]
    async fn timed_out_job_releases_slot() {
        let store = ResultStore::new();
        let cfg = ExecutorConfig {
            job_timeout: Some(Duration::from_millis(50)),
            ..config(1, 8)
        };
        let executor = JobExecutor::new(&cfg, Arc::clone(&store), LogSink::new());

        let slow = request("May");
        let next = request("August");
        executor.submit(slow.clone(), Arc::new(SleepyJob)).await.unwrap();
        executor.submit(next.clone(), Arc::new(EchoJob)).await.unwrap();

        match wait_for(&store, &slow.key()).await {
            Outcome::Error { message } => assert!(message.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(wait_for(&store, &next.key()).await.is_success());
    }

    #[tokio::test]
    async fn full_queue_rejects_submission() {
        let store = ResultStore::new();
        let executor = JobExecutor::new(&config(1, 1), Arc::clone(&store), LogSink::new());
        let gate = Arc::new(Notify::new());
        let job = Arc::new(GatedJob {
            gate: Arc::clone(&gate),
            payload: "done",
        });

        executor.submit(request("January"), job.clone()).await.unwrap();
        let exec = Arc::clone(&executor);
        wait_until(move || exec.running() == 1).await;

        executor.submit(request("February"), job.clone()).await.unwrap();
        let err = executor.submit(request("March"), job.clone()).await.unwrap_err();
        assert!(matches!(err, JobError::PoolSaturated { capacity: 1 }));
        assert_eq!(store.status(&request("March").key()).await, JobStatus::Unknown);

        gate.notify_one();
        wait_for(&store, &request("January").key()).await;
        gate.notify_one();
        wait_for(&store, &request("February").key()).await;
    }

    #[tokio::test]
    async fn overlapping_runs_of_same_key_last_finisher_wins() {
        let store = ResultStore::new();
        let executor = JobExecutor::new(&config(2, 8), Arc::clone(&store), LogSink::new());
        let key = request("December").key();

        let first_gate = Arc::new(Notify::new());
        let second_gate = Arc::new(Notify::new());
        let first = Arc::new(GatedJob {
            gate: Arc::clone(&first_gate),
            payload: "first",
        });
        let second = Arc::new(GatedJob {
            gate: Arc::clone(&second_gate),
            payload: "second",
        });

        executor.submit(request("December"), first).await.unwrap();
        executor.submit(request("December"), second).await.unwrap();
        assert_eq!(store.status(&key).await, JobStatus::Pending);

        second_gate.notify_one();
        assert_eq!(wait_for(&store, &key).await, Outcome::success("second"));

        first_gate.notify_one();
        tokio::time::timeout(WAIT, async {
            while store.get(&key).await != Some(Outcome::success("first")) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first run never overwrote the outcome");
    }

    #[tokio::test]
    async fn shutdown_drains_queue_then_rejects() {
        let store = ResultStore::new();
        let executor = JobExecutor::new(&config(1, 8), Arc::clone(&store), LogSink::new());

        for month in ["January", "February", "March"] {
            executor.submit(request(month), Arc::new(EchoJob)).await.unwrap();
        }
        executor.shutdown().await;

        for month in ["January", "February", "March"] {
            assert!(store.get(&request(month).key()).await.is_some());
        }
        assert_eq!(executor.queued(), 0);
        assert_eq!(executor.running(), 0);

        let err = executor.submit(request("April"), Arc::new(EchoJob)).await.unwrap_err();
        assert!(matches!(err, JobError::ShuttingDown));
    }
}
