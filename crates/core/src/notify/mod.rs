//! Completion notifier - typed fan-out of update cycle events.
//!
//! One broadcast channel carries every [`UpdateEvent`]. Consumers either take
//! a raw receiver ([`UpdateNotifier::subscribe`]) or attach an
//! [`UpdateListener`], which gets its own dispatcher task so a slow listener
//! never holds up the update cycle.

mod events;
mod listener;
mod notifier;

pub use events::{Notice, NoticeLevel, RunCompleted, RunProgress, RunStarted, UpdateEvent};
pub use listener::UpdateListener;
pub use notifier::UpdateNotifier;
