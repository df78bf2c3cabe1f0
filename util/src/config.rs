//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub code_ttl_minutes: i64,
    pub default_geofence_radius_m: f64,
    pub qr_render_base_url: String,
    pub enforce_geofence: bool,
    pub stats_window_days: u32,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every key has a default so the service and its tests start without a
    /// `.env` file. `JWT_SECRET` defaults to empty, which makes the admin guard
    /// reject every token until a secret is configured.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "smartclass-attendance".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info,db=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/attendance.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: parsed_or("PORT", 5000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            code_ttl_minutes: parsed_or("CODE_TTL_MINUTES", 30),
            default_geofence_radius_m: parsed_or("DEFAULT_GEOFENCE_RADIUS_M", 2000.0),
            qr_render_base_url: env::var("QR_RENDER_BASE_URL")
                .unwrap_or_else(|_| "https://api.qrserver.com/v1/create-qr-code/".into()),
            enforce_geofence: env::var("ENFORCE_GEOFENCE").unwrap_or_else(|_| "false".into())
                == "true",
            stats_window_days: parsed_or("STATS_WINDOW_DAYS", 30),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock
                .write()
                .expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_port(value: u16) {
        AppConfig::set_field(|cfg| cfg.port = value);
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_code_ttl_minutes(value: i64) {
        AppConfig::set_field(|cfg| cfg.code_ttl_minutes = value);
    }

    pub fn set_default_geofence_radius_m(value: f64) {
        AppConfig::set_field(|cfg| cfg.default_geofence_radius_m = value);
    }

    pub fn set_qr_render_base_url(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.qr_render_base_url = value.into());
    }

    pub fn set_enforce_geofence(value: bool) {
        AppConfig::set_field(|cfg| cfg.enforce_geofence = value);
    }

    pub fn set_stats_window_days(value: u32) {
        AppConfig::set_field(|cfg| cfg.stats_window_days = value);
    }
}

// --- Free accessors, so call sites read `config::port()` ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

/// Lifetime of a freshly issued attendance code. Never less than one minute.
pub fn code_ttl() -> chrono::Duration {
    chrono::Duration::minutes(AppConfig::global().code_ttl_minutes.max(1))
}

pub fn default_geofence_radius_m() -> f64 {
    AppConfig::global().default_geofence_radius_m
}

pub fn qr_render_base_url() -> String {
    AppConfig::global().qr_render_base_url.clone()
}

pub fn enforce_geofence() -> bool {
    AppConfig::global().enforce_geofence
}

pub fn stats_window_days() -> u32 {
    AppConfig::global().stats_window_days
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn setters_override_and_reset_restores() {
        AppConfig::set_code_ttl_minutes(5);
        AppConfig::set_enforce_geofence(true);
        assert_eq!(code_ttl(), chrono::Duration::minutes(5));
        assert!(enforce_geofence());

        AppConfig::reset();
        assert_eq!(
            code_ttl(),
            chrono::Duration::minutes(parsed_or("CODE_TTL_MINUTES", 30i64).max(1))
        );
    }

    #[test]
    #[serial]
    fn ttl_is_clamped_to_one_minute() {
        AppConfig::set_code_ttl_minutes(0);
        assert_eq!(code_ttl(), chrono::Duration::minutes(1));
        AppConfig::reset();
    }

    #[test]
    fn parsed_or_falls_back_when_unset() {
        assert_eq!(parsed_or("SMARTCLASS_TEST_UNSET_KEY", 42u32), 42);
    }
}
