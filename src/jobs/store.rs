//! Result store — last outcome per job key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use super::model::{JobKey, JobStatus, Outcome};

/// What is known about one key.
#[derive(Debug, Clone, Default)]
pub struct JobRecord {
    /// Outcome of the most recently completed run.
    pub outcome: Option<Outcome>,
    /// Runs submitted for this key that have not completed yet.
    pub in_flight: usize,
    /// When `outcome` was written (tokio clock, so paused tests can age it).
    pub completed_at: Option<Instant>,
}

impl JobRecord {
    pub fn status(&self) -> JobStatus {
        match (&self.outcome, self.in_flight) {
            (Some(_), _) => JobStatus::Completed,
            (None, 0) => JobStatus::Unknown,
            (None, _) => JobStatus::Pending,
        }
    }
}

/// Concurrent map from [`JobKey`] to its latest outcome.
///
/// Writes replace the whole record under the write lock, so readers see
/// either the previous outcome or the new one. When two runs of the same
/// key overlap, whichever finishes last wins.
pub struct ResultStore {
    records: RwLock<HashMap<JobKey, JobRecord>>,
}

impl ResultStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(HashMap::new()),
        })
    }

    /// Record that a run for `key` has been accepted.
    pub async fn mark_pending(&self, key: &JobKey) {
        let mut records = self.records.write().await;
        records.entry(key.clone()).or_default().in_flight += 1;
    }

    /// Undo a `mark_pending` for a run that was never enqueued.
    pub async fn release_pending(&self, key: &JobKey) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(key) {
            record.in_flight = record.in_flight.saturating_sub(1);
            if record.outcome.is_none() && record.in_flight == 0 {
                records.remove(key);
            }
        }
    }

    /// Store the outcome for `key`, overwriting any previous one.
    pub async fn put(&self, key: JobKey, outcome: Outcome) {
        debug!(key = %key, success = outcome.is_success(), "Storing job outcome");
        let mut records = self.records.write().await;
        let record = records.entry(key).or_default();
        record.outcome = Some(outcome);
        record.in_flight = record.in_flight.saturating_sub(1);
        record.completed_at = Some(Instant::now());
    }

    /// Latest outcome for `key`, or `None` if nothing has completed.
    pub async fn get(&self, key: &JobKey) -> Option<Outcome> {
        self.records
            .read()
            .await
            .get(key)
            .and_then(|r| r.outcome.clone())
    }

    /// Current status of `key`.
    pub async fn status(&self, key: &JobKey) -> JobStatus {
        self.records
            .read()
            .await
            .get(key)
            .map(JobRecord::status)
            .unwrap_or(JobStatus::Unknown)
    }

    /// Status and outcome read under one lock.
    pub async fn lookup(&self, key: &JobKey) -> (JobStatus, Option<Outcome>) {
        let records = self.records.read().await;
        match records.get(key) {
            Some(record) => (record.status(), record.outcome.clone()),
            None => (JobStatus::Unknown, None),
        }
    }

    /// Number of keys with a record.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Drop completed records older than `ttl`. Keys with a run in flight
    /// are kept. Returns the number of records removed.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut records = self.records.write().await;
        let before = records.len();

        records.retain(|_, record| {
            if record.in_flight > 0 {
                return true;
            }
            match record.completed_at {
                Some(at) => now.saturating_duration_since(at) < ttl,
                None => true,
            }
        });

        let evicted = before - records.len();
        if evicted > 0 {
            info!(count = evicted, "Evicted expired job results");
        }
        evicted
    }
}

/// Spawn a background task that periodically evicts expired results.
pub fn spawn_eviction_task(store: Arc<ResultStore>, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let period = ttl.clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            store.evict_expired(ttl).await;
        }
    })
}
