//! Application configuration loaded from environment variables.

use crate::services::strava::{SyncOptions, PER_PAGE};
use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Path of the archive snapshot file
    pub archive_path: PathBuf,
    /// Strava API base URL (overridable for tests)
    pub strava_api_base: String,
    /// Hard bound on page requests per sync
    pub sync_max_pages: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a local-development default; numeric variables fail
    /// loudly when set to something unparsable instead of being silently
    /// replaced.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            archive_path: env::var("ARCHIVE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/activity_archive.json")),
            strava_api_base: env::var("STRAVA_API_BASE")
                .unwrap_or_else(|_| "https://www.strava.com/api/v3".to_string()),
            sync_max_pages: parse_var("SYNC_MAX_PAGES", 100)?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            archive_path: PathBuf::from("data/test_archive.json"),
            strava_api_base: "http://127.0.0.1:0".to_string(),
            sync_max_pages: 100,
        }
    }

    /// Sync knobs derived from configuration.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            per_page: PER_PAGE,
            max_pages: self.sync_max_pages,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} has an invalid value")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test body: these mutate process-global environment variables and
    // must not run concurrently with each other.
    #[test]
    fn test_config_from_env() {
        env::remove_var("PORT");
        env::remove_var("SYNC_MAX_PAGES");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.sync_max_pages, 100);
        assert_eq!(config.strava_api_base, "https://www.strava.com/api/v3");

        env::set_var("SYNC_MAX_PAGES", "lots");
        let result = Config::from_env();
        env::remove_var("SYNC_MAX_PAGES");
        assert!(matches!(result, Err(ConfigError::Invalid("SYNC_MAX_PAGES"))));
    }
}
