//! Service configuration

use std::env;

/// Hours a session stays valid before lazy expiry.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database file; `None` keeps everything in memory
    pub database_file: Option<String>,

    /// Directory for uploaded listing images, served under /media
    pub media_dir: String,

    /// Browser origin allowed to send credentialed requests
    pub cors_origin: String,

    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Insert demo data on startup when the store is empty
    pub seed_data: bool,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database_file: env::var("DATABASE_FILE").ok().filter(|v| !v.is_empty()),
            media_dir: env::var("MEDIA_DIR").unwrap_or(defaults.media_dir),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_ttl_hours),
            seed_data: env::var("SEED_DATA")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.seed_data),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_file: None,
            media_dir: "media".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            seed_data: false,
        }
    }
}
