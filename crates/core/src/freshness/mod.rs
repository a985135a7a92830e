//! Freshness checker - decides whether fetching a catalog is warranted.

mod checker;
mod probe;

pub use checker::FreshnessChecker;
pub use probe::{FreshnessProbe, HttpFreshnessProbe};
