use std::sync::Arc;

use async_trait::async_trait;
use stats_domain::{EventType, RawEvent};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics::PipelineMetrics;

/// Real-time state hints derived from single events.
#[async_trait]
pub trait SideEffectHandler: Send + Sync {
    fn handles(&self, event_type: &EventType) -> bool;
    async fn apply(&self, event: &RawEvent) -> anyhow::Result<()>;
}

type SideEffectReceiver = mpsc::Receiver<Arc<RawEvent>>;

/// Cloneable, non-blocking entry point into the side-effect pool.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    sender: mpsc::Sender<Arc<RawEvent>>,
    handler: Arc<dyn SideEffectHandler>,
    metrics: Arc<PipelineMetrics>,
}

impl SideEffectDispatcher {
    /// Events without effects are ignored. Returns false only when shed.
    pub fn dispatch(&self, event: &Arc<RawEvent>) -> bool {
        if !self.handler.handles(&event.event_type) {
            return true;
        }

        match self.sender.try_send(Arc::clone(event)) {
            Ok(()) => {
                self.metrics.record_side_effect_dispatched();
                true
            }
            Err(TrySendError::Full(event)) | Err(TrySendError::Closed(event)) => {
                self.metrics.record_side_effect_shed();
                debug!(event_type = %event.event_type, "side-effect queue saturated, effect shed");
                false
            }
        }
    }
}

/// Bounded pool applying side effects with a fixed concurrency ceiling.
pub struct SideEffectPool {
    worker_count: usize,
    receiver: Arc<Mutex<SideEffectReceiver>>,
    dispatcher: SideEffectDispatcher,
    metrics: Arc<PipelineMetrics>,
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl SideEffectPool {
    pub fn new(
        worker_count: usize,
        queue_size: usize,
        handler: Arc<dyn SideEffectHandler>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            worker_count: worker_count.max(1),
            receiver: Arc::new(Mutex::new(receiver)),
            dispatcher: SideEffectDispatcher {
                sender,
                handler,
                metrics: metrics.clone(),
            },
            metrics,
            shutdown_tx,
            workers: Vec::new(),
        }
    }

    pub fn dispatcher(&self) -> SideEffectDispatcher {
        self.dispatcher.clone()
    }

    pub fn start(&mut self) {
        if !self.workers.is_empty() {
            return;
        }
        for id in 0..self.worker_count {
            let worker = EffectWorker {
                id,
                receiver: self.receiver.clone(),
                handler: self.dispatcher.handler.clone(),
                metrics: self.metrics.clone(),
                shutdown_rx: self.shutdown_tx.subscribe(),
            };
            self.workers.push(tokio::spawn(worker.run()));
        }
        info!(workers = self.worker_count, "side-effect pool started");
    }

    /// Applies whatever is still queued, then returns once every worker exited.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "side-effect worker panicked");
            }
        }
        info!("side-effect pool stopped");
    }
}

struct EffectWorker {
    id: usize,
    receiver: Arc<Mutex<SideEffectReceiver>>,
    handler: Arc<dyn SideEffectHandler>,
    metrics: Arc<PipelineMetrics>,
    shutdown_rx: watch::Receiver<bool>,
}

impl EffectWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => break,

                event = next_event(&self.receiver) => match event {
                    Some(event) => self.apply(&event).await,
                    None => break,
                },
            }
        }

        loop {
            let event = {
                let mut receiver = self.receiver.lock().await;
                receiver.close();
                receiver.try_recv().ok()
            };
            match event {
                Some(event) => self.apply(&event).await,
                None => break,
            }
        }
        debug!(worker = self.id, "side-effect worker exited");
    }

    async fn apply(&self, event: &RawEvent) {
        if let Err(err) = self.handler.apply(event).await {
            self.metrics.record_side_effect_failed();
            warn!(
                worker = self.id,
                event_type = %event.event_type,
                match_id = %event.match_id,
                error = %err,
                "side effect failed"
            );
        }
    }
}

async fn next_event(receiver: &Mutex<SideEffectReceiver>) -> Option<Arc<RawEvent>> {
    receiver.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingHandler {
        applied: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SideEffectHandler for CountingHandler {
        fn handles(&self, event_type: &EventType) -> bool {
            *event_type == EventType::Kill
        }

        async fn apply(&self, _event: &RawEvent) -> anyhow::Result<()> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("store unavailable");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn applies_queued_effects_before_stopping() {
        let metrics = Arc::new(PipelineMetrics::default());
        let handler = Arc::new(CountingHandler {
            applied: AtomicUsize::new(0),
            fail: false,
        });
        let mut pool = SideEffectPool::new(2, 16, handler.clone(), metrics.clone());
        let dispatcher = pool.dispatcher();

        for _ in 0..5 {
            assert!(dispatcher.dispatch(&Arc::new(RawEvent::new(EventType::Kill, "m1"))));
        }
        assert!(dispatcher.dispatch(&Arc::new(RawEvent::new(EventType::Jump, "m1"))));

        pool.start();
        pool.stop().await;

        assert_eq!(handler.applied.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn saturated_queue_sheds_and_failures_are_counted() {
        let metrics = Arc::new(PipelineMetrics::default());
        let handler = Arc::new(CountingHandler {
            applied: AtomicUsize::new(0),
            fail: true,
        });
        let mut pool = SideEffectPool::new(1, 1, handler.clone(), metrics.clone());
        let dispatcher = pool.dispatcher();

        assert!(dispatcher.dispatch(&Arc::new(RawEvent::new(EventType::Kill, "m1"))));
        assert!(!dispatcher.dispatch(&Arc::new(RawEvent::new(EventType::Kill, "m1"))));

        pool.start();
        pool.stop().await;

        assert_eq!(handler.applied.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.side_effects_failed(), 1);
    }
}
