use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use stats_domain::ports::EventSink;
use stats_domain::{NormalizedRecord, Normalizer, PipelineConfig, UNLINKED_ACCOUNT};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::identity::IdentityResolver;
use crate::metrics::PipelineMetrics;
use crate::pipeline::queue::{IngestReceiver, IntakeGate, Job};
use crate::pipeline::side_effects::{SideEffectDispatcher, SideEffectPool};

/// Fixed set of workers draining the ingestion queue into batched inserts.
pub struct IngestionPool {
    config: PipelineConfig,
    receiver: Arc<Mutex<IngestReceiver>>,
    intake: IntakeGate,
    sink: Arc<dyn EventSink>,
    normalizer: Arc<Normalizer>,
    resolver: Option<Arc<IdentityResolver>>,
    side_effects: Option<SideEffectPool>,
    dispatcher: Option<SideEffectDispatcher>,
    metrics: Arc<PipelineMetrics>,
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl IngestionPool {
    pub fn new(
        config: PipelineConfig,
        receiver: IngestReceiver,
        sink: Arc<dyn EventSink>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config: config.normalized(),
            intake: receiver.intake(),
            receiver: Arc::new(Mutex::new(receiver)),
            sink,
            normalizer: Arc::new(Normalizer::standard()),
            resolver: None,
            side_effects: None,
            dispatcher: None,
            metrics,
            shutdown_tx,
            workers: Vec::new(),
        }
    }

    /// Fills missing account ids at flush time.
    pub fn with_identity(mut self, resolver: Arc<IdentityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_side_effects(mut self, side_effects: SideEffectPool) -> Self {
        self.side_effects = Some(side_effects);
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn start(&mut self) {
        if !self.workers.is_empty() {
            return;
        }

        self.dispatcher = self.side_effects.as_mut().map(|pool| {
            pool.start();
            pool.dispatcher()
        });

        for id in 0..self.config.worker_count {
            let worker = self.worker(id);
            self.workers.push(tokio::spawn(worker.run()));
        }

        info!(
            workers = self.config.worker_count,
            queue_size = self.config.queue_size,
            batch_size = self.config.batch_size,
            flush_interval_ms = self.config.flush_interval.as_millis() as u64,
            "ingestion pool started"
        );
    }

    /// Shuts down in dependency order:
    /// 1. closes intake so external producers are shed;
    /// 2. workers flush what is buffered and exit;
    /// 3. the side-effect pool drains, possibly queueing derived events;
    /// 4. the queue closes and one last pass flushes those derived events.
    pub async fn stop(&mut self) {
        self.intake.close();
        let _ = self.shutdown_tx.send(true);

        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                error!(error = %err, "ingestion worker panicked");
            }
        }

        if let Some(side_effects) = self.side_effects.as_mut() {
            side_effects.stop().await;
        }

        self.receiver.lock().await.close();
        self.worker(self.config.worker_count)
            .finish(Vec::new())
            .await;
        info!("ingestion pool stopped");
    }

    fn worker(&self, id: usize) -> Worker {
        Worker {
            id,
            receiver: self.receiver.clone(),
            sink: self.sink.clone(),
            normalizer: self.normalizer.clone(),
            resolver: self.resolver.clone(),
            side_effects: self.dispatcher.clone(),
            metrics: self.metrics.clone(),
            batch_size: self.config.batch_size,
            flush_interval: self.config.flush_interval,
            shutdown_rx: self.shutdown_tx.subscribe(),
        }
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<IngestReceiver>>,
    sink: Arc<dyn EventSink>,
    normalizer: Arc<Normalizer>,
    resolver: Option<Arc<IdentityResolver>>,
    side_effects: Option<SideEffectDispatcher>,
    metrics: Arc<PipelineMetrics>,
    batch_size: usize,
    flush_interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        let mut batch: Vec<NormalizedRecord> = Vec::with_capacity(self.batch_size);
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(worker = self.id, "ingestion worker started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => break,

                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.flush(&mut batch).await;
                    }
                }

                job = next_job(&self.receiver) => match job {
                    Some(job) => {
                        self.accept(job, &mut batch);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => break,
                },
            }
        }

        self.finish(batch).await;
        debug!(worker = self.id, "ingestion worker exited");
    }

    /// Takes whatever is still buffered, then flushes the remainder.
    async fn finish(&self, mut batch: Vec<NormalizedRecord>) {
        loop {
            let job = self.receiver.lock().await.try_recv().ok();
            let Some(job) = job else { break };
            self.accept(job, &mut batch);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch).await;
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }
    }

    fn accept(&self, job: Job, batch: &mut Vec<NormalizedRecord>) {
        batch.push(
            self.normalizer
                .normalize(&job.event, &job.raw_json, job.received_at),
        );
        if let Some(side_effects) = &self.side_effects {
            side_effects.dispatch(&job.event);
        }
    }

    async fn flush(&self, batch: &mut Vec<NormalizedRecord>) {
        let mut records = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        self.fill_accounts(&mut records).await;

        let started = std::time::Instant::now();
        match self.sink.insert_records(&records).await {
            Ok(()) => {
                self.metrics.record_flush(records.len(), started.elapsed());
                debug!(worker = self.id, batch_size = records.len(), "batch flushed");
            }
            Err(err) => {
                self.metrics
                    .record_failed_flush(records.len(), started.elapsed());
                error!(
                    worker = self.id,
                    batch_size = records.len(),
                    error = %err,
                    "batch insert failed, batch discarded"
                );
            }
        }
    }

    async fn fill_accounts(&self, records: &mut [NormalizedRecord]) {
        let Some(resolver) = &self.resolver else { return };

        let mut guids: HashSet<String> = HashSet::new();
        for record in records.iter() {
            if record.actor_smf_id == UNLINKED_ACCOUNT && is_player_id(&record.actor_id) {
                guids.insert(record.actor_id.clone());
            }
            if record.target_smf_id == UNLINKED_ACCOUNT && is_player_id(&record.target_id) {
                guids.insert(record.target_id.clone());
            }
        }
        if guids.is_empty() {
            return;
        }

        let guids: Vec<String> = guids.into_iter().collect();
        match resolver.resolve_batch(&guids).await {
            Ok(accounts) => {
                for record in records.iter_mut() {
                    if record.actor_smf_id == UNLINKED_ACCOUNT {
                        if let Some(smf_id) = accounts.get(&record.actor_id) {
                            record.actor_smf_id = *smf_id;
                        }
                    }
                    if record.target_smf_id == UNLINKED_ACCOUNT {
                        if let Some(smf_id) = accounts.get(&record.target_id) {
                            record.target_smf_id = *smf_id;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(worker = self.id, error = %err, "account resolution failed, flushing without account ids");
            }
        }
    }
}

fn is_player_id(id: &str) -> bool {
    !id.is_empty() && id != "world"
}

async fn next_job(receiver: &Mutex<IngestReceiver>) -> Option<Job> {
    receiver.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use stats_domain::{EventType, RawEvent};

    use super::*;
    use crate::pipeline::effects::EventEffects;
    use crate::pipeline::queue::ingest_channel;
    use crate::pipeline::side_effects::SideEffectHandler;
    use crate::realtime::MatchStateMachine;
    use crate::test_support::{
        wait_until, CountingIdentityRepository, InMemoryStateStore, RecordingSink,
    };

    #[derive(Default)]
    struct CountingEffects {
        applied: AtomicUsize,
    }

    #[async_trait]
    impl SideEffectHandler for CountingEffects {
        fn handles(&self, event_type: &EventType) -> bool {
            *event_type == EventType::Kill
        }

        async fn apply(&self, _event: &RawEvent) -> anyhow::Result<()> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(workers: usize, batch_size: usize, flush_interval: Duration) -> PipelineConfig {
        PipelineConfig {
            worker_count: workers,
            queue_size: 64,
            batch_size,
            flush_interval,
            ..PipelineConfig::default()
        }
    }

    fn kill(n: usize) -> RawEvent {
        let mut event = RawEvent::new(EventType::Kill, "m1");
        event.attacker_guid = format!("attacker-{n}");
        event
    }

    #[tokio::test]
    async fn full_batch_flushes_once_in_arrival_order() {
        let metrics = Arc::new(PipelineMetrics::default());
        let sink = Arc::new(RecordingSink::default());
        let (queue, receiver) = ingest_channel(64, metrics.clone());
        for n in 0..4 {
            assert!(queue.enqueue(kill(n)));
        }

        let mut pool = IngestionPool::new(
            config(1, 4, Duration::from_secs(60)),
            receiver,
            sink.clone(),
            metrics.clone(),
        );
        pool.start();

        assert!(wait_until(Duration::from_secs(2), || sink.call_count() == 1).await);
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let actors: Vec<&str> = batches[0].iter().map(|r| r.actor_id.as_str()).collect();
        assert_eq!(actors, vec!["attacker-0", "attacker-1", "attacker-2", "attacker-3"]);

        pool.stop().await;
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test]
    async fn timer_flushes_partial_batch_once() {
        let metrics = Arc::new(PipelineMetrics::default());
        let sink = Arc::new(RecordingSink::default());
        let (queue, receiver) = ingest_channel(64, metrics.clone());
        for n in 0..3 {
            assert!(queue.enqueue(kill(n)));
        }

        let mut pool = IngestionPool::new(
            config(1, 100, Duration::from_millis(50)),
            receiver,
            sink.clone(),
            metrics.clone(),
        );
        pool.start();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(sink.call_count(), 1);
        assert_eq!(sink.batches()[0].len(), 3);

        pool.stop().await;
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test]
    async fn stop_accounts_for_every_accepted_event() {
        let metrics = Arc::new(PipelineMetrics::default());
        let sink = Arc::new(RecordingSink::failing_every(3));
        let (queue, receiver) = ingest_channel(256, metrics.clone());

        let mut pool = IngestionPool::new(
            config(4, 7, Duration::from_secs(60)),
            receiver,
            sink.clone(),
            metrics.clone(),
        );
        pool.start();

        let mut accepted = 0u64;
        for n in 0..200 {
            if queue.enqueue(kill(n)) {
                accepted += 1;
            }
        }
        pool.stop().await;

        assert_eq!(metrics.events_ingested(), accepted);
        assert_eq!(
            metrics.events_processed() + metrics.events_failed(),
            accepted
        );
        assert!(metrics.events_failed() > 0);
        assert!(!queue.enqueue(kill(999)));
    }

    #[tokio::test]
    async fn flush_fills_missing_account_ids() {
        let metrics = Arc::new(PipelineMetrics::default());
        let sink = Arc::new(RecordingSink::default());
        let repo = Arc::new(CountingIdentityRepository::default());
        repo.insert("attacker-0", 42);
        let resolver = Arc::new(IdentityResolver::new(repo.clone(), Duration::from_secs(300)));

        let (queue, receiver) = ingest_channel(8, metrics.clone());
        let mut event = kill(0);
        event.victim_guid = "anonymous".to_string();
        assert!(queue.enqueue(event));

        let mut pool = IngestionPool::new(
            config(1, 1, Duration::from_secs(60)),
            receiver,
            sink.clone(),
            metrics.clone(),
        )
        .with_identity(resolver);
        pool.start();
        pool.stop().await;

        let batches = sink.batches();
        assert_eq!(batches[0][0].actor_smf_id, 42);
        assert_eq!(batches[0][0].target_smf_id, 0);
        assert_eq!(repo.batch_lookups(), 1);
    }

    #[tokio::test]
    async fn side_effects_run_when_every_flush_fails() {
        let metrics = Arc::new(PipelineMetrics::default());
        let sink = Arc::new(RecordingSink::failing_every(1));
        let handler = Arc::new(CountingEffects::default());
        let (queue, receiver) = ingest_channel(64, metrics.clone());
        for n in 0..5 {
            assert!(queue.enqueue(kill(n)));
        }

        let mut pool = IngestionPool::new(
            config(2, 2, Duration::from_secs(60)),
            receiver,
            sink.clone(),
            metrics.clone(),
        )
        .with_side_effects(SideEffectPool::new(2, 64, handler.clone(), metrics.clone()));
        pool.start();
        pool.stop().await;

        assert_eq!(handler.applied.load(Ordering::SeqCst), 5);
        assert_eq!(metrics.events_failed(), 5);
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn match_end_outcomes_are_flushed_before_stop_returns() {
        let metrics = Arc::new(PipelineMetrics::default());
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(InMemoryStateStore::default());
        let (queue, receiver) = ingest_channel(64, metrics.clone());

        let effects = EventEffects::new(MatchStateMachine::new(
            store.clone(),
            queue.clone(),
            metrics.clone(),
        ));
        let mut pool = IngestionPool::new(
            config(1, 100, Duration::from_secs(60)),
            receiver,
            sink.clone(),
            metrics.clone(),
        )
        .with_side_effects(SideEffectPool::new(1, 64, Arc::new(effects), metrics.clone()));

        assert!(queue.enqueue(RawEvent::new(EventType::MatchStart, "m1")));
        for (guid, team) in [("g1", "allies"), ("g2", "axis")] {
            let mut spawn = RawEvent::new(EventType::Spawn, "m1");
            spawn.player_guid = guid.to_string();
            spawn.player_team = team.to_string();
            assert!(queue.enqueue(spawn));
        }
        let mut win = RawEvent::new(EventType::TeamWin, "m1");
        win.winning_team = "allies".to_string();
        assert!(queue.enqueue(win));
        assert!(queue.enqueue(RawEvent::new(EventType::MatchEnd, "m1")));

        pool.start();
        pool.stop().await;

        let mut outcomes: Vec<(String, u32)> = sink
            .batches()
            .into_iter()
            .flatten()
            .filter(|record| record.event_type == "match_outcome")
            .map(|record| (record.actor_id, record.damage))
            .collect();
        outcomes.sort();
        assert_eq!(outcomes, vec![("g1".to_string(), 1), ("g2".to_string(), 0)]);
        assert!(store.is_match_cleared("m1"));
        assert_eq!(metrics.events_load_shed(), 0);
        assert!(!queue.enqueue(kill(0)));
    }
}
