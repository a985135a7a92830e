use super::{types::Config, ConfigError};

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Remote timeout is not 0
/// - Remote locations are HTTP(S) URLs
/// - Diff window is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Remote validation
    if config.remote.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "remote.timeout_secs cannot be 0".to_string(),
        ));
    }
    for (key, url) in [
        ("remote.full_url", &config.remote.full_url),
        ("remote.diff_url", &config.remote.diff_url),
        ("remote.router_base", &config.remote.router_base),
    ] {
        if !is_http_url(url) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http(s) URL, got '{}'",
                key, url
            )));
        }
    }

    // Update validation
    if config.update.diff_window_hours == 0 {
        return Err(ConfigError::ValidationError(
            "update.diff_window_hours cannot be 0".to_string(),
        ));
    }

    Ok(())
}
