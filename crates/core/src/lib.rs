pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod freshness;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod testing;

pub use catalog::{
    Catalog, CatalogContext, CatalogEntry, CatalogMeta, CatalogStore, CatalogSummary,
    JsonFileStore, MatchStrategy, MergeStats, StoreError,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    UpdateMode,
};
pub use fetcher::{CatalogFetcher, CatalogSource, FetchError, FetchKind, HttpCatalogFetcher};
pub use freshness::{FreshnessChecker, FreshnessProbe, HttpFreshnessProbe};
pub use notify::{Notice, NoticeLevel, RunCompleted, UpdateEvent, UpdateListener, UpdateNotifier};
pub use orchestrator::{
    OrchestratorStatus, UpdateError, UpdateOrchestrator, UpdateOutcome, UpdatePhase,
    UpdateReport, UpdateRequest,
};
