use std::sync::Arc;

use filmlist_core::{CatalogContext, Config, SanitizedConfig, UpdateNotifier, UpdateOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<UpdateOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<UpdateOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<UpdateOrchestrator> {
        &self.orchestrator
    }

    pub fn catalog(&self) -> &CatalogContext {
        self.orchestrator.context()
    }

    pub fn notifier(&self) -> &UpdateNotifier {
        self.orchestrator.notifier()
    }
}
