use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filmlist_core::{
    catalog::ParseOptions, fetcher::build_client, load_config, validate_config, Catalog,
    CatalogContext, CatalogStore, HttpCatalogFetcher, HttpFreshnessProbe, JsonFileStore,
    StoreError, UpdateMode, UpdateNotifier, UpdateOrchestrator, UpdateRequest,
};
use filmlist_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    // Config path: first argument, then FILMLIST_CONFIG, then ./config.toml
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FILMLIST_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Film list path: {:?}", config.catalog.path);
    info!("Update mode: {:?}", config.update.mode);

    // Last-known-good catalog
    let store: Arc<dyn CatalogStore> = Arc::new(JsonFileStore::new(&config.catalog.path));
    let initial = load_stored_catalog(store.as_ref(), &ParseOptions::from(&config.catalog)).await?;
    let context = CatalogContext::with_catalog(initial);

    // Remote access
    let client = build_client(&config.remote).context("Failed to create HTTP client")?;
    let fetcher = Arc::new(HttpCatalogFetcher::with_client(client.clone()));
    let probe = Arc::new(
        HttpFreshnessProbe::with_client(client, config.remote.id_url())
            .with_timeout(config.remote.timeout()),
    );

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        config.clone(),
        context,
        fetcher,
        probe,
        store,
        UpdateNotifier::default(),
    ));
    info!("Update orchestrator initialized");

    if config.update.load_on_startup {
        let startup = Arc::clone(&orchestrator);
        let request = UpdateRequest::auto().interactive(config.update.mode.is_interactive());
        tokio::spawn(async move {
            let outcome = startup.run(request).await;
            info!("Startup update finished: {}", outcome.as_str());
        });
    }
    if config.update.mode == UpdateMode::Automatic && config.update.check_interval_minutes > 0 {
        let every = Duration::from_secs(u64::from(config.update.check_interval_minutes) * 60);
        orchestrator.spawn_periodic_checks(every);
    } else {
        info!("Periodic update checks disabled");
    }

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    orchestrator.shutdown();
    orchestrator.flush().await;
    info!("Pending catalog writes finished");

    Ok(())
}

/// Console logging; `FILMLIST_LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("FILMLIST_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Load the persisted catalog, starting empty when there is none.
async fn load_stored_catalog(store: &dyn CatalogStore, options: &ParseOptions) -> Result<Catalog> {
    match store.load(options) {
        Ok(catalog) => {
            info!(
                "Loaded stored film list: generated {}, {} entries",
                catalog.gen_date(),
                catalog.len()
            );
            Ok(catalog)
        }
        Err(StoreError::NotFound(path)) => {
            info!("No stored film list at {}, starting empty", path);
            Ok(Catalog::new())
        }
        Err(StoreError::Malformed(e)) => {
            warn!("Stored film list is unreadable, starting empty: {}", e);
            Ok(Catalog::new())
        }
        Err(e) => Err(e).context("Failed to read stored film list"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
