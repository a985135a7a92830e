use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub update: UpdateConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Local catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Where the last-known-good catalog is persisted.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Drop entries older than this many days while parsing (0 = keep all).
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Write pretty-printed JSON instead of the compact form.
    #[serde(default)]
    pub human_readable: bool,
    /// Persist the catalog after every successful update.
    #[serde(default = "default_true")]
    pub write_on_update: bool,
    #[serde(default = "default_true")]
    pub load_trailers: bool,
    #[serde(default = "default_true")]
    pub load_audio_description: bool,
    #[serde(default = "default_true")]
    pub load_sign_language: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            max_age_days: default_max_age_days(),
            human_readable: false,
            write_on_update: true,
            load_trailers: true,
            load_audio_description: true,
            load_sign_language: true,
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("filmliste.json")
}

fn default_max_age_days() -> u32 {
    0
}

fn default_true() -> bool {
    true
}

/// Remote catalog source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Location of the full catalog.
    #[serde(default = "default_full_url")]
    pub full_url: String,
    /// Location of the diff catalog.
    #[serde(default = "default_diff_url")]
    pub diff_url: String,
    /// Base address of the freshness endpoint (`<base>/filmliste.id`).
    #[serde(default = "default_router_base")]
    pub router_base: String,
    /// Timeout in seconds (default: 30). Catalog downloads apply it to
    /// connecting and to each read; the freshness probe to the whole request.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            full_url: default_full_url(),
            diff_url: default_diff_url(),
            router_base: default_router_base(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl RemoteConfig {
    /// URL of the freshness token.
    pub fn id_url(&self) -> String {
        format!("{}/filmliste.id", self.router_base.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.timeout_secs))
    }
}

fn default_full_url() -> String {
    "https://liste.mediathekview.de/Filmliste-akt.json".to_string()
}

fn default_diff_url() -> String {
    "https://liste.mediathekview.de/Filmliste-diff.json".to_string()
}

fn default_router_base() -> String {
    "https://res.mediathekview.de".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    concat!("filmlist/", env!("CARGO_PKG_VERSION")).to_string()
}

/// How update checks are driven.
///
/// `Automatic` enables periodic background checks, which only log negative
/// results. In `Manual` mode the service runs no periodic checks and treats its
/// own startup check as interactive, publishing negative results as notices.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Manual,
    #[default]
    Automatic,
}

impl UpdateMode {
    pub fn is_interactive(self) -> bool {
        self == Self::Manual
    }
}

/// Update cycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub mode: UpdateMode,
    /// Lists older than this are only ever replaced by a full list.
    #[serde(default = "default_diff_window_hours")]
    pub diff_window_hours: u32,
    /// Match diff entries by their index hint before falling back to URL.
    #[serde(default = "default_true")]
    pub match_by_index: bool,
    /// Run an update cycle right after startup.
    #[serde(default = "default_true")]
    pub load_on_startup: bool,
    /// Period of background checks in minutes (0 = disabled).
    #[serde(default)]
    pub check_interval_minutes: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            mode: UpdateMode::default(),
            diff_window_hours: default_diff_window_hours(),
            match_by_index: true,
            load_on_startup: true,
            check_interval_minutes: 0,
        }
    }
}

impl UpdateConfig {
    pub fn diff_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.diff_window_hours))
    }
}

fn default_diff_window_hours() -> u32 {
    24
}

/// Sanitized config for API responses (URL credentials redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub remote: SanitizedRemoteConfig,
    pub update: UpdateConfig,
}

/// Sanitized remote config (passwords in URLs hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRemoteConfig {
    pub full_url: String,
    pub diff_url: String,
    pub router_base: String,
    pub timeout_secs: u32,
}

fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            catalog: config.catalog.clone(),
            remote: SanitizedRemoteConfig {
                full_url: redact_url(&config.remote.full_url),
                diff_url: redact_url(&config.remote.diff_url),
                router_base: redact_url(&config.remote.router_base),
                timeout_secs: config.remote.timeout_secs,
            },
            update: config.update.clone(),
        }
    }
}
