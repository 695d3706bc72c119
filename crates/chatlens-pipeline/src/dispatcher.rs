//! Per-conversation ordered dispatch.
//!
//! Each conversation key gets its own worker task fed by an unbounded
//! channel, so one conversation's events are handled strictly one after
//! another while different conversations proceed concurrently. A worker
//! that sees no events for the idle period retires; the next event for its
//! key starts a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use chatlens_core::events::InboundEvent;
use chatlens_core::transport::ReplySink;
use chatlens_core::types::ConversationKey;

use crate::error::PipelineError;
use crate::orchestrator::IngestionPipeline;

type WorkerMap = Arc<Mutex<HashMap<ConversationKey, UnboundedSender<InboundEvent>>>>;

pub struct ConversationDispatcher {
    pipeline: Arc<IngestionPipeline>,
    sink: Arc<dyn ReplySink>,
    idle: Duration,
    workers: WorkerMap,
    tracker: TaskTracker,
}

impl ConversationDispatcher {
    pub fn new(pipeline: Arc<IngestionPipeline>, sink: Arc<dyn ReplySink>, idle: Duration) -> Self {
        Self {
            pipeline,
            sink,
            idle,
            workers: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Queue an event behind any earlier events for the same conversation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: InboundEvent) -> Result<(), PipelineError> {
        let key = event.key().clone();
        let mut workers = self
            .workers
            .lock()
            .map_err(|e| PipelineError::Transport(format!("worker map lock poisoned: {}", e)))?;

        // Checked under the lock: `shutdown` closes the tracker while holding
        // it, so no worker can be registered or spawned after the close.
        if self.tracker.is_closed() {
            return Err(PipelineError::Transport("dispatcher is shut down".into()));
        }

        let mut event = event;
        if let Some(tx) = workers.get(&key) {
            match tx.send(event) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(returned)) => event = returned,
            }
            // Worker exited without deregistering (panicked); replace it.
            workers.remove(&key);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(event)
            .map_err(|_| PipelineError::Transport("worker channel closed".into()))?;
        workers.insert(key.clone(), tx);

        debug!(key = %key, "Starting conversation worker");
        self.tracker.spawn(run_worker(
            key,
            rx,
            Arc::clone(&self.pipeline),
            Arc::clone(&self.sink),
            Arc::clone(&self.workers),
            self.idle,
        ));
        drop(workers);
        Ok(())
    }

    /// Number of conversations with a live worker.
    pub fn active_workers(&self) -> usize {
        self.workers.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Stop accepting events and wait for queued ones to finish.
    pub async fn shutdown(&self) {
        {
            let workers = self.workers.lock();
            self.tracker.close();
            if let Ok(mut workers) = workers {
                workers.clear();
            }
        }
        self.tracker.wait().await;
        debug!("Dispatcher drained");
    }
}

async fn run_worker(
    key: ConversationKey,
    mut rx: UnboundedReceiver<InboundEvent>,
    pipeline: Arc<IngestionPipeline>,
    sink: Arc<dyn ReplySink>,
    workers: WorkerMap,
    idle: Duration,
) {
    loop {
        let event = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                // Senders only push while holding the map lock, so an empty
                // queue observed under the lock stays empty once we deregister.
                let next = {
                    let Ok(mut map) = workers.lock() else { break };
                    match rx.try_recv() {
                        Ok(event) => Some(event),
                        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                            map.remove(&key);
                            None
                        }
                    }
                };
                match next {
                    Some(event) => event,
                    None => {
                        debug!(key = %key, "Conversation worker retired");
                        break;
                    }
                }
            }
        };

        deliver(&key, pipeline.handle(event).await, sink.as_ref()).await;
    }
}

async fn deliver(
    key: &ConversationKey,
    result: Result<chatlens_core::events::ReplyPayload, PipelineError>,
    sink: &dyn ReplySink,
) {
    match result {
        Ok(reply) if reply.is_nothing() => {}
        Ok(reply) => {
            if let Err(e) = sink.deliver(key, reply).await {
                warn!(key = %key, error = %e, "Reply delivery failed");
            }
        }
        Err(e) => {
            error!(key = %key, error = %e, "Event processing failed");
            if let Err(e) = sink.deliver_failure(key, e.user_message()).await {
                warn!(key = %key, error = %e, "Failure notice delivery failed");
            }
        }
    }
}
