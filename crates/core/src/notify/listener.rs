use async_trait::async_trait;

use super::events::{Notice, RunCompleted, RunProgress, RunStarted};

/// Observer of update cycles.
///
/// All methods default to no-ops. Calls for one listener are made in event
/// order from that listener's dispatcher task.
#[async_trait]
pub trait UpdateListener: Send + Sync {
    async fn on_start(&self, _event: &RunStarted) {}

    async fn on_progress(&self, _event: &RunProgress) {}

    async fn on_complete(&self, _event: &RunCompleted) {}

    /// Called at most once per notifier, after the first `on_complete`.
    async fn on_first_complete(&self, _event: &RunCompleted) {}

    async fn on_notice(&self, _notice: &Notice) {}
}
