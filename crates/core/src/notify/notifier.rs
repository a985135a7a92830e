use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::events::{Notice, RunCompleted, RunProgress, RunStarted, UpdateEvent};
use super::listener::UpdateListener;

/// Broadcaster for update events.
///
/// Cheaply cloneable; all clones publish to the same subscribers and share the
/// first-completion latch.
#[derive(Debug, Clone)]
pub struct UpdateNotifier {
    sender: broadcast::Sender<UpdateEvent>,
    first_completed: Arc<AtomicBool>,
}

impl UpdateNotifier {
    /// Create a new notifier with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            first_completed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn publish(&self, event: UpdateEvent) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.sender.subscribe()
    }

    pub fn started(&self, run_id: &str, source: &str) {
        self.publish(UpdateEvent::Started(RunStarted {
            run_id: run_id.to_string(),
            source: source.to_string(),
        }));
    }

    pub fn progress(&self, run_id: &str, phase: &str, bytes_read: u64, total_bytes: Option<u64>) {
        self.publish(UpdateEvent::Progress(RunProgress {
            run_id: run_id.to_string(),
            phase: phase.to_string(),
            bytes_read,
            total_bytes,
        }));
    }

    pub fn notice(&self, notice: Notice) {
        self.publish(UpdateEvent::Notice(notice));
    }

    /// Publish the completion of a cycle.
    ///
    /// The first call on any clone of this notifier additionally publishes
    /// `FirstCompleted`.
    pub fn complete(&self, event: RunCompleted) {
        let first = !self.first_completed.swap(true, Ordering::SeqCst);
        if first {
            self.publish(UpdateEvent::Completed(event.clone()));
            self.publish(UpdateEvent::FirstCompleted(event));
        } else {
            self.publish(UpdateEvent::Completed(event));
        }
    }

    /// Whether a cycle has completed during this notifier's lifetime.
    pub fn has_completed(&self) -> bool {
        self.first_completed.load(Ordering::SeqCst)
    }

    /// Deliver events to `listener` from a dedicated task.
    ///
    /// Only events published after this call are delivered. The task ends once
    /// every clone of the notifier is dropped.
    pub fn attach(&self, listener: Arc<dyn UpdateListener>) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => dispatch(listener.as_ref(), &event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Update listener lagged, skipped {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Update notifier closed, stopping listener");
                        break;
                    }
                }
            }
        })
    }
}

impl Default for UpdateNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

async fn dispatch(listener: &dyn UpdateListener, event: &UpdateEvent) {
    match event {
        UpdateEvent::Started(e) => listener.on_start(e).await,
        UpdateEvent::Progress(e) => listener.on_progress(e).await,
        UpdateEvent::Completed(e) => listener.on_complete(e).await,
        UpdateEvent::FirstCompleted(e) => listener.on_first_complete(e).await,
        UpdateEvent::Notice(n) => listener.on_notice(n).await,
    }
}
