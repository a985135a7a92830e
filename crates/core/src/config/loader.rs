//! Configuration loading.
//!
//! A TOML file provides the base; `FILMLIST_`-prefixed environment variables
//! override single keys, with `__` separating section and field:
//!
//! ```text
//! FILMLIST_UPDATE__MODE=manual
//! FILMLIST_REMOTE__FULL_URL=https://mirror.local/Filmliste-akt.json
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

const ENV_PREFIX: &str = "FILMLIST_";

/// Variables under the prefix that drive the process, not the config tree.
const PROCESS_VARS: [&str; 2] = ["config", "log_format"];

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_with_env_prefix(path, ENV_PREFIX)
}

fn load_with_env_prefix(path: &Path, prefix: &str) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(prefix).ignore(&PROCESS_VARS).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from a TOML string, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpdateMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.update.mode, UpdateMode::Automatic);
        assert_eq!(config.update.diff_window_hours, 24);
        assert!(config.catalog.write_on_update);
    }

    #[test]
    fn test_unknown_update_mode_is_rejected() {
        let toml = r#"
[update]
mode = "sometimes"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/filmlist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_catalog_and_remote_sections() {
        let file = config_file(
            r#"
[catalog]
path = "/var/lib/filmlist/filmliste.json"
max_age_days = 14
load_trailers = false

[remote]
full_url = "https://mirror.local/Filmliste-akt.json"
diff_url = "https://mirror.local/Filmliste-diff.json"
timeout_secs = 120
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.catalog.path, Path::new("/var/lib/filmlist/filmliste.json"));
        assert_eq!(config.catalog.max_age_days, 14);
        assert!(!config.catalog.load_trailers);
        assert_eq!(config.remote.diff_url, "https://mirror.local/Filmliste-diff.json");
        assert_eq!(config.remote.timeout().as_secs(), 120);
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let file = config_file(
            r#"
[update]
mode = "automatic"
diff_window_hours = 24
"#,
        );
        // prefix unique to this test, so parallel tests see nothing
        std::env::set_var("FLT_LOADER_UPDATE__MODE", "manual");
        std::env::set_var("FLT_LOADER_UPDATE__DIFF_WINDOW_HOURS", "6");
        std::env::set_var("FLT_LOADER_LOG_FORMAT", "json");

        let config = load_with_env_prefix(file.path(), "FLT_LOADER_").unwrap();

        assert_eq!(config.update.mode, UpdateMode::Manual);
        assert_eq!(config.update.diff_window_hours, 6);
    }
}
