//! Listener recording every update event, for assertions.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::notify::{Notice, RunCompleted, RunProgress, RunStarted, UpdateEvent, UpdateListener};

/// Update listener that records the events it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<UpdateEvent>>,
    changed: Notify,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, event: UpdateEvent) {
        self.events.lock().await.push(event);
        self.changed.notify_one();
    }

    /// All events received so far.
    pub async fn events(&self) -> Vec<UpdateEvent> {
        self.events.lock().await.clone()
    }

    pub async fn completions(&self) -> Vec<RunCompleted> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                UpdateEvent::Completed(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn first_completions(&self) -> Vec<RunCompleted> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                UpdateEvent::FirstCompleted(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                UpdateEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` completions arrived, up to five seconds.
    ///
    /// Returns the completions seen when waiting ended.
    pub async fn wait_for_completions(&self, count: usize) -> Vec<RunCompleted> {
        let wait = async {
            loop {
                if self.completions().await.len() >= count {
                    return;
                }
                self.changed.notified().await;
            }
        };
        let _ = tokio::time::timeout(Duration::from_secs(5), wait).await;
        self.completions().await
    }
}

#[async_trait]
impl UpdateListener for RecordingListener {
    async fn on_start(&self, event: &RunStarted) {
        self.record(UpdateEvent::Started(event.clone())).await;
    }

    async fn on_progress(&self, event: &RunProgress) {
        self.record(UpdateEvent::Progress(event.clone())).await;
    }

    async fn on_complete(&self, event: &RunCompleted) {
        self.record(UpdateEvent::Completed(event.clone())).await;
    }

    async fn on_first_complete(&self, event: &RunCompleted) {
        self.record(UpdateEvent::FirstCompleted(event.clone())).await;
    }

    async fn on_notice(&self, notice: &Notice) {
        self.record(UpdateEvent::Notice(notice.clone())).await;
    }
}
