//! Conversation hand-off queue.
//!
//! The scanner enqueues one `ConversationJob` per admitted pair and returns.
//! A dispatcher task drains the queue and spawns one driver run per job;
//! driver failures are logged here and go no further.

use crate::conversation::{ConversationContext, ConversationDriver};
use flyway_core::{BirdId, ConversationId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything the driver needs to run one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationJob {
    pub conversation_id: ConversationId,
    /// Speaks first
    pub initiator: BirdId,
    pub responder: BirdId,
    pub context: ConversationContext,
}

/// Sending half of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ConversationQueue {
    tx: mpsc::UnboundedSender<ConversationJob>,
}

/// Receiving half, handed to the dispatcher.
#[derive(Debug)]
pub struct ConversationInbox {
    rx: mpsc::UnboundedReceiver<ConversationJob>,
}

impl ConversationQueue {
    pub fn channel() -> (ConversationQueue, ConversationInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConversationQueue { tx }, ConversationInbox { rx })
    }

    /// Returns false if the dispatcher is gone and the job was dropped.
    pub fn enqueue(&self, job: ConversationJob) -> bool {
        let conversation_id = job.conversation_id;
        match self.tx.send(job) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(%conversation_id, "Conversation queue closed, job dropped");
                false
            }
        }
    }
}

impl ConversationInbox {
    pub async fn recv(&mut self) -> Option<ConversationJob> {
        self.rx.recv().await
    }

    /// Pop a job without waiting.
    pub fn try_recv(&mut self) -> Option<ConversationJob> {
        self.rx.try_recv().ok()
    }
}

/// Counters for dispatched conversations.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub started: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
}

impl DispatchMetrics {
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DispatchMetricsSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Drain `inbox` until every queue handle is dropped.
pub fn spawn_dispatcher(
    driver: Arc<ConversationDriver>,
    mut inbox: ConversationInbox,
    metrics: Arc<DispatchMetrics>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Conversation dispatcher started");
        while let Some(job) = inbox.recv().await {
            let driver = driver.clone();
            let metrics = metrics.clone();
            metrics.started.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(async move {
                match driver.run(&job).await {
                    Ok(outcome) => {
                        metrics.completed.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(
                            conversation_id = %job.conversation_id,
                            rounds = outcome.rounds,
                            "Dispatched conversation finished"
                        );
                    }
                    Err(e) => {
                        metrics.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(
                            conversation_id = %job.conversation_id,
                            error = %e,
                            "Dispatched conversation failed"
                        );
                    }
                }
            });
        }
        tracing::info!("Conversation dispatcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyway_core::new_entity_id;

    fn job() -> ConversationJob {
        ConversationJob {
            conversation_id: new_entity_id(),
            initiator: new_entity_id(),
            responder: new_entity_id(),
            context: ConversationContext {
                location: "Poyang Lake, Jiangxi".to_string(),
                activity: "wintering".to_string(),
                weather: None,
                scene: None,
            },
        }
    }

    #[tokio::test]
    async fn test_enqueue_delivers_in_order() {
        let (queue, mut inbox) = ConversationQueue::channel();
        let first = job();
        let second = job();
        assert!(queue.enqueue(first.clone()));
        assert!(queue.enqueue(second.clone()));
        assert_eq!(inbox.try_recv(), Some(first));
        assert_eq!(inbox.try_recv(), Some(second));
        assert_eq!(inbox.try_recv(), None);
    }

    #[tokio::test]
    async fn test_enqueue_after_inbox_dropped_reports_false() {
        let (queue, inbox) = ConversationQueue::channel();
        drop(inbox);
        assert!(!queue.enqueue(job()));
    }
}
