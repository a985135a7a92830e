//! Mock freshness probe for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::fetcher::FetchError;
use crate::freshness::FreshnessProbe;

type ErrorFactory = Box<dyn Fn() -> FetchError + Send + Sync>;

enum Reply {
    Id(Option<String>),
    Fail(ErrorFactory),
}

/// Mock implementation of the FreshnessProbe trait.
///
/// Answers every call with the configured token or error and counts calls.
pub struct MockFreshnessProbe {
    reply: RwLock<Reply>,
    calls: AtomicUsize,
}

impl MockFreshnessProbe {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply: RwLock::new(reply),
            calls: AtomicUsize::new(0),
        }
    }

    /// Probe reporting `id` as the remote token.
    pub fn with_id(id: &str) -> Self {
        Self::with_reply(Reply::Id(Some(id.to_string())))
    }

    /// Probe whose endpoint answers with an empty body.
    pub fn empty() -> Self {
        Self::with_reply(Reply::Id(None))
    }

    /// Probe failing every call with the error built by `error`.
    pub fn failing(error: impl Fn() -> FetchError + Send + Sync + 'static) -> Self {
        Self::with_reply(Reply::Fail(Box::new(error)))
    }

    /// Change the reported token.
    pub async fn set_id(&self, id: &str) {
        *self.reply.write().await = Reply::Id(Some(id.to_string()));
    }

    /// Number of probes made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FreshnessProbe for MockFreshnessProbe {
    async fn remote_id(&self) -> Result<Option<String>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.reply.read().await {
            Reply::Id(id) => Ok(id.clone()),
            Reply::Fail(error) => Err(error()),
        }
    }
}
