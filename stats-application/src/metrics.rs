use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Pipeline counters rendered in Prometheus text format.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    events_ingested: AtomicU64,
    events_load_shed: AtomicU64,
    events_processed: AtomicU64,
    events_failed: AtomicU64,
    batches_flushed: AtomicU64,
    batches_failed: AtomicU64,
    flush_micros: AtomicU64,
    side_effects_dispatched: AtomicU64,
    side_effects_shed: AtomicU64,
    side_effects_failed: AtomicU64,
    outcomes_synthesized: AtomicU64,
    achievements_unlocked: AtomicU64,
}

impl PipelineMetrics {
    pub fn record_ingested(&self) {
        self.events_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_shed(&self) {
        self.events_load_shed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, event_count: usize, elapsed: Duration) {
        self.events_processed
            .fetch_add(event_count as u64, Ordering::Relaxed);
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.flush_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_failed_flush(&self, event_count: usize, elapsed: Duration) {
        self.events_failed
            .fetch_add(event_count as u64, Ordering::Relaxed);
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.flush_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_side_effect_dispatched(&self) {
        self.side_effects_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_side_effect_shed(&self) {
        self.side_effects_shed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_side_effect_failed(&self) {
        self.side_effects_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcomes(&self, count: usize) {
        self.outcomes_synthesized
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_achievement(&self) {
        self.achievements_unlocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_ingested(&self) -> u64 {
        self.events_ingested.load(Ordering::Relaxed)
    }

    pub fn events_load_shed(&self) -> u64 {
        self.events_load_shed.load(Ordering::Relaxed)
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn events_failed(&self) -> u64 {
        self.events_failed.load(Ordering::Relaxed)
    }

    pub fn side_effects_failed(&self) -> u64 {
        self.side_effects_failed.load(Ordering::Relaxed)
    }

    pub fn outcomes_synthesized(&self) -> u64 {
        self.outcomes_synthesized.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self, queue_depth: usize) -> String {
        let flush_seconds = self.flush_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;

        format!(
            "# TYPE mohaa_events_ingested_total counter\n\
mohaa_events_ingested_total {}\n\
# TYPE mohaa_events_load_shed_total counter\n\
mohaa_events_load_shed_total {}\n\
# TYPE mohaa_events_processed_total counter\n\
mohaa_events_processed_total {}\n\
# TYPE mohaa_events_failed_total counter\n\
mohaa_events_failed_total {}\n\
# TYPE mohaa_batches_flushed_total counter\n\
mohaa_batches_flushed_total {}\n\
# TYPE mohaa_batches_failed_total counter\n\
mohaa_batches_failed_total {}\n\
# TYPE mohaa_batch_insert_seconds_total counter\n\
mohaa_batch_insert_seconds_total {:.6}\n\
# TYPE mohaa_side_effects_dispatched_total counter\n\
mohaa_side_effects_dispatched_total {}\n\
# TYPE mohaa_side_effects_shed_total counter\n\
mohaa_side_effects_shed_total {}\n\
# TYPE mohaa_side_effects_failed_total counter\n\
mohaa_side_effects_failed_total {}\n\
# TYPE mohaa_match_outcomes_synthesized_total counter\n\
mohaa_match_outcomes_synthesized_total {}\n\
# TYPE mohaa_achievements_unlocked_total counter\n\
mohaa_achievements_unlocked_total {}\n\
# TYPE mohaa_worker_queue_depth gauge\n\
mohaa_worker_queue_depth {}\n",
            self.events_ingested.load(Ordering::Relaxed),
            self.events_load_shed.load(Ordering::Relaxed),
            self.events_processed.load(Ordering::Relaxed),
            self.events_failed.load(Ordering::Relaxed),
            self.batches_flushed.load(Ordering::Relaxed),
            self.batches_failed.load(Ordering::Relaxed),
            flush_seconds,
            self.side_effects_dispatched.load(Ordering::Relaxed),
            self.side_effects_shed.load(Ordering::Relaxed),
            self.side_effects_failed.load(Ordering::Relaxed),
            self.outcomes_synthesized.load(Ordering::Relaxed),
            self.achievements_unlocked.load(Ordering::Relaxed),
            queue_depth
        )
    }
}
