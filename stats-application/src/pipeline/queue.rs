use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use stats_domain::RawEvent;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, warn};

use crate::metrics::PipelineMetrics;

/// One accepted event waiting for a worker.
#[derive(Debug, Clone)]
pub struct Job {
    pub event: Arc<RawEvent>,
    pub raw_json: String,
    pub received_at: OffsetDateTime,
}

pub type IngestSender = mpsc::Sender<Job>;

/// Whether external producers may still submit. Closed first on shutdown so
/// derived events can still be queued while the pipeline drains.
#[derive(Clone)]
pub struct IntakeGate(Arc<AtomicBool>);

impl IntakeGate {
    fn open() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn close(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer handle of the bounded ingestion queue. Never blocks.
#[derive(Clone)]
pub struct IngestQueue {
    sender: IngestSender,
    intake: IntakeGate,
    metrics: Arc<PipelineMetrics>,
}

/// Consumer side, owned by the ingestion pool.
pub struct IngestReceiver {
    inner: mpsc::Receiver<Job>,
    intake: IntakeGate,
}

impl IngestReceiver {
    pub async fn recv(&mut self) -> Option<Job> {
        self.inner.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Job, TryRecvError> {
        self.inner.try_recv()
    }

    /// Closes intake and the channel. Buffered jobs stay receivable.
    pub fn close(&mut self) {
        self.intake.close();
        self.inner.close();
    }

    pub fn intake(&self) -> IntakeGate {
        self.intake.clone()
    }
}

/// Creates the bounded queue shared by producers and the ingestion pool.
pub fn ingest_channel(capacity: usize, metrics: Arc<PipelineMetrics>) -> (IngestQueue, IngestReceiver) {
    let (sender, inner) = mpsc::channel(capacity.max(1));
    let intake = IntakeGate::open();
    (
        IngestQueue {
            sender,
            intake: intake.clone(),
            metrics,
        },
        IngestReceiver { inner, intake },
    )
}

impl IngestQueue {
    /// Returns false when the event was shed. Callers surface that as backpressure.
    pub fn enqueue(&self, event: RawEvent) -> bool {
        if !self.intake.is_open() {
            self.metrics.record_load_shed();
            debug!(event_type = %event.event_type, "ingest intake closed, event shed");
            return false;
        }
        self.send(event)
    }

    /// Queues an event the pipeline derived itself. Accepted until the
    /// channel closes, even after intake stopped.
    pub fn enqueue_derived(&self, event: RawEvent) -> bool {
        self.send(event)
    }

    fn send(&self, event: RawEvent) -> bool {
        let raw_json = audit_json(&event);
        let job = Job {
            event: Arc::new(event),
            raw_json,
            received_at: OffsetDateTime::now_utc(),
        };

        match self.sender.try_send(job) {
            Ok(()) => {
                self.metrics.record_ingested();
                true
            }
            Err(TrySendError::Full(job)) => {
                self.metrics.record_load_shed();
                debug!(event_type = %job.event.event_type, "ingest queue full, event shed");
                false
            }
            Err(TrySendError::Closed(job)) => {
                self.metrics.record_load_shed();
                debug!(event_type = %job.event.event_type, "ingest queue closed, event shed");
                false
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        !self.intake.is_open() || self.sender.is_closed()
    }
}

/// Compact JSON of the populated fields only, kept for audit in `raw_json`.
fn audit_json(event: &RawEvent) -> String {
    let value = match serde_json::to_value(event) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "failed to serialize event for audit");
            return String::new();
        }
    };

    let compact = match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, field)| !is_zero(field))
                .collect(),
        ),
        other => other,
    };
    compact.to_string()
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
