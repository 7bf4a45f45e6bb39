//! Log sink — shared FIFO of job output lines, drained by polling clients.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};
use uuid::Uuid;

/// Process-wide queue of captured job output.
///
/// Lines from every running job land here in the order they were written.
/// There is no per-job separation on the read side.
pub struct LogSink {
    entries: Mutex<VecDeque<String>>,
    /// Maximum retained entries; `None` means unbounded.
    capacity: Option<usize>,
    dropped: AtomicU64,
}

impl LogSink {
    /// Create an unbounded sink.
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Create a sink that keeps at most `capacity` entries, dropping the
    /// oldest on overflow. A capacity of 0 means unbounded.
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Self::build((capacity > 0).then_some(capacity))
    }

    fn build(capacity: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
            dropped: AtomicU64::new(0),
        })
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panicking writer cannot leave the deque half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one trimmed line. Blank input is ignored.
    pub fn write(&self, text: &str) {
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        let mut entries = self.entries();
        if let Some(capacity) = self.capacity {
            if entries.len() >= capacity {
                entries.pop_front();
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if total.is_power_of_two() {
                    warn!(capacity, dropped = total, "Log sink full, dropping oldest lines");
                }
            }
        }
        entries.push_back(line.to_string());
    }

    /// Remove and return every buffered line, oldest first.
    pub fn drain_all(&self) -> Vec<String> {
        self.entries().drain(..).collect()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Total lines discarded because the sink was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Output handle given to a single job.
///
/// Jobs write progress through this instead of a process-wide stream; each
/// line goes to the shared [`LogSink`] and is mirrored to `tracing` with the
/// job id attached.
#[derive(Clone)]
pub struct JobLog {
    job_id: Uuid,
    sink: Arc<LogSink>,
}

impl JobLog {
    pub fn new(job_id: Uuid, sink: Arc<LogSink>) -> Self {
        Self { job_id, sink }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Write one line of job output.
    pub fn write(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        debug!(job_id = %self.job_id, line = %text.trim(), "Job output");
        self.sink.write(text);
    }
}
