//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when `SIGNAGE_API_BASE_URL` is set
//! 2. Otherwise a config file, probed from several locations
//! 3. JSON and TOML are both accepted
//!
//! ## Environment Variables
//! - `SIGNAGE_API_BASE_URL` (required)
//! - `SIGNAGE_API_REALTIME_URL`
//! - `SIGNAGE_API_TIMEOUT_SECS`
//! - `SIGNAGE_API_MAX_ATTEMPTS`
//! - `SIGNAGE_API_BASE_BACKOFF_MS`
//! - `SIGNAGE_API_MAX_BACKOFF_MS`
//! - `SIGNAGE_OFFLINE_ENABLED` (true/false)
//! - `SIGNAGE_OFFLINE_DB_PATH`
//! - `SIGNAGE_OFFLINE_MAX_RETRIES`
//! - `SIGNAGE_RATE_LIMIT_WARN`
//! - `SIGNAGE_RATE_LIMIT_CRITICAL`
//!
//! ## File Locations
//! 1. `./signage.{json,toml}`, `./config.{json,toml}`
//! 2. The same names one and two directories up
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use signage_domain::{ClientConfig, ConfigError};
use tracing::{debug, info};

const CONFIG_FILE_NAMES: [&str; 4] = ["signage.json", "signage.toml", "config.json", "config.toml"];

/// Load configuration from the environment, falling back to a file.
pub fn load() -> Result<ClientConfig, ConfigError> {
    match load_from_env() {
        Ok(config) => {
            info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `SIGNAGE_*` environment variables.
///
/// Only the base URL is required; everything else keeps its default.
pub fn load_from_env() -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::new(env_var("SIGNAGE_API_BASE_URL")?);

    if let Ok(url) = std::env::var("SIGNAGE_API_REALTIME_URL") {
        config.api.realtime_url = Some(url);
    }
    if let Some(secs) = env_parse("SIGNAGE_API_TIMEOUT_SECS")? {
        config.api.timeout_secs = secs;
    }
    if let Some(attempts) = env_parse("SIGNAGE_API_MAX_ATTEMPTS")? {
        config.api.max_attempts = attempts;
    }
    if let Some(ms) = env_parse("SIGNAGE_API_BASE_BACKOFF_MS")? {
        config.api.base_backoff_ms = ms;
    }
    if let Some(ms) = env_parse("SIGNAGE_API_MAX_BACKOFF_MS")? {
        config.api.max_backoff_ms = ms;
    }

    config.offline.enabled = env_bool("SIGNAGE_OFFLINE_ENABLED", config.offline.enabled);
    if let Ok(path) = std::env::var("SIGNAGE_OFFLINE_DB_PATH") {
        config.offline.db_path = path;
    }
    if let Some(retries) = env_parse("SIGNAGE_OFFLINE_MAX_RETRIES")? {
        config.offline.max_retries = retries;
    }

    if let Some(warn) = env_parse("SIGNAGE_RATE_LIMIT_WARN")? {
        config.rate_limit.warn_below = warn;
    }
    if let Some(critical) = env_parse("SIGNAGE_RATE_LIMIT_CRITICAL")? {
        config.rate_limit.critical_below = critical;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file.
///
/// With `None`, the first file found by [`probe_config_paths`] is used.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConfigError("No config file found in any of the standard locations".to_string())
        })?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ConfigError(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => {
            toml::from_str(contents).map_err(|e| ConfigError(format!("Invalid TOML format: {e}")))
        }
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError(format!("Invalid JSON format: {e}"))),
        _ => Err(ConfigError(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .map_err(|_| ConfigError(format!("Missing required environment variable: {key}")))
}

/// Optional numeric variable; set-but-unparsable is an error.
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use signage_domain::Priority;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 11] = [
        "SIGNAGE_API_BASE_URL",
        "SIGNAGE_API_REALTIME_URL",
        "SIGNAGE_API_TIMEOUT_SECS",
        "SIGNAGE_API_MAX_ATTEMPTS",
        "SIGNAGE_API_BASE_BACKOFF_MS",
        "SIGNAGE_API_MAX_BACKOFF_MS",
        "SIGNAGE_OFFLINE_ENABLED",
        "SIGNAGE_OFFLINE_DB_PATH",
        "SIGNAGE_OFFLINE_MAX_RETRIES",
        "SIGNAGE_RATE_LIMIT_WARN",
        "SIGNAGE_RATE_LIMIT_CRITICAL",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_config(contents: &str, extension: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        (temp_file, path)
    }

    #[test]
    fn env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("SIGNAGE_TEST_BOOL_YES", "YES");
        std::env::set_var("SIGNAGE_TEST_BOOL_OFF", "off");
        assert!(env_bool("SIGNAGE_TEST_BOOL_YES", false));
        assert!(!env_bool("SIGNAGE_TEST_BOOL_OFF", true));

        std::env::remove_var("SIGNAGE_TEST_BOOL_MISSING");
        assert!(env_bool("SIGNAGE_TEST_BOOL_MISSING", true));

        std::env::remove_var("SIGNAGE_TEST_BOOL_YES");
        std::env::remove_var("SIGNAGE_TEST_BOOL_OFF");
    }

    #[test]
    fn load_from_env_applies_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SIGNAGE_API_BASE_URL", "https://api.example.com/v1");
        std::env::set_var("SIGNAGE_API_REALTIME_URL", "wss://rt.example.com");
        std::env::set_var("SIGNAGE_API_MAX_ATTEMPTS", "5");
        std::env::set_var("SIGNAGE_OFFLINE_ENABLED", "false");
        std::env::set_var("SIGNAGE_OFFLINE_DB_PATH", "/tmp/queue.db");
        std::env::set_var("SIGNAGE_RATE_LIMIT_WARN", "20");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config loads from env");
        assert_eq!(config.api.base_url, "https://api.example.com/v1");
        assert_eq!(config.api.realtime_url.as_deref(), Some("wss://rt.example.com"));
        assert_eq!(config.api.max_attempts, 5);
        assert!(!config.offline.enabled);
        assert_eq!(config.offline.db_path, "/tmp/queue.db");
        assert_eq!(config.rate_limit.warn_below, 20);
        assert_eq!(config.rate_limit.critical_below, 5);
    }

    #[test]
    fn load_from_env_requires_base_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(err.0.contains("SIGNAGE_API_BASE_URL"));
    }

    #[test]
    fn load_from_env_rejects_bad_numbers_and_zero_attempts() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SIGNAGE_API_BASE_URL", "https://api.example.com");
        std::env::set_var("SIGNAGE_API_TIMEOUT_SECS", "soon");
        let bad_number = load_from_env();

        std::env::set_var("SIGNAGE_API_TIMEOUT_SECS", "10");
        std::env::set_var("SIGNAGE_API_MAX_ATTEMPTS", "0");
        let zero_attempts = load_from_env();
        clear_env();

        assert!(bad_number.unwrap_err().0.contains("SIGNAGE_API_TIMEOUT_SECS"));
        assert!(zero_attempts.is_err());
    }

    #[test]
    fn load_from_file_json() {
        let (_temp, path) = write_config(
            r#"{
                "api": { "base_url": "https://api.example.com", "max_attempts": 4 },
                "offline": { "default_priority": "high" }
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).expect("loads JSON config");
        assert_eq!(config.api.max_attempts, 4);
        assert_eq!(config.offline.default_priority, Priority::High);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_toml() {
        let (_temp, path) = write_config(
            r#"
[api]
base_url = "https://api.example.com"
timeout_secs = 12

[rate_limit]
warn_below = 50
critical_below = 25
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).expect("loads TOML config");
        assert_eq!(config.api.timeout_secs, 12);
        assert_eq!(config.rate_limit.critical_below, 25);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_validates() {
        let (_temp, path) =
            write_config(r#"{ "api": { "base_url": "ftp://files.example.com" } }"#, "json");

        assert!(load_from_file(Some(path.clone())).is_err());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/signage.json")));
        assert!(result.unwrap_err().0.contains("not found"));
    }

    #[test]
    fn parse_config_unsupported_format() {
        let result = parse_config("api: {}", &PathBuf::from("signage.yaml"));
        assert!(result.is_err());
    }
}
