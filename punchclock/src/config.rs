//! Configuration lookups with controlled precedence between the process
//! environment and a dotenv file.
//!
//! Default precedence is env var → dotenv → default. With `PREFER_DOTENV=true`
//! the dotenv file wins over the environment. The process environment is never
//! modified.

use crate::drivers::DriverOptions;
use crate::errors::AutomationError;
use crate::site::DEFAULT_LOGIN_URL;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Config {
    env: HashMap<String, String>,
    dotenv: HashMap<String, String>,
    dotenv_path: Option<PathBuf>,
}

impl Config {
    /// Snapshot the process environment and read the dotenv file, if any.
    pub fn load() -> Result<Self, AutomationError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let (dotenv_path, dotenv) = match explicit_dotenv_path(&env) {
            Some(path) => {
                let values = read_dotenv(&path)?;
                (Some(path), values)
            }
            None => (None, discover_dotenv()?),
        };
        debug!(
            dotenv = ?dotenv_path,
            keys = dotenv.len(),
            "Configuration loaded"
        );
        Ok(Self {
            env,
            dotenv,
            dotenv_path,
        })
    }

    /// Build from explicit sources without touching the filesystem.
    pub fn from_sources(env: HashMap<String, String>, dotenv: HashMap<String, String>) -> Self {
        Self {
            env,
            dotenv,
            dotenv_path: None,
        }
    }

    pub fn dotenv_path(&self) -> Option<&Path> {
        self.dotenv_path.as_deref()
    }

    fn prefer_dotenv(&self) -> bool {
        non_empty(self.env.get("PREFER_DOTENV"))
            .or_else(|| non_empty(self.dotenv.get("PREFER_DOTENV")))
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Value for `key` from the preferred source, then the other one.
    /// Empty strings count as absent.
    pub fn get_opt(&self, key: &str) -> Option<String> {
        let env = non_empty(self.env.get(key));
        let dotenv = non_empty(self.dotenv.get(key));
        let value = if self.prefer_dotenv() {
            dotenv.or(env)
        } else {
            env.or(dotenv)
        };
        value.map(str::to_string)
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        self.get_opt(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_opt(key) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64, AutomationError> {
        match self.get_opt(key) {
            Some(value) => value.trim().parse().map_err(|_| {
                AutomationError::InvalidArgument(format!(
                    "{key} must be a whole number, got '{value}'"
                ))
            }),
            None => Ok(default),
        }
    }

    pub fn get_secs(&self, key: &str, default: u64) -> Result<Duration, AutomationError> {
        self.get_u64(key, default).map(Duration::from_secs)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn explicit_dotenv_path(env: &HashMap<String, String>) -> Option<PathBuf> {
    for key in ["DOTENV_PATH", "DOTENV_FILE"] {
        if let Some(explicit) = non_empty(env.get(key)) {
            let path = PathBuf::from(explicit);
            if path.is_file() {
                return Some(path);
            }
            warn!("{} points to a missing file: {}", key, path.display());
        }
    }
    None
}

/// `.env` in the working directory or the nearest parent that has one
fn discover_dotenv() -> Result<HashMap<String, String>, AutomationError> {
    match dotenvy::dotenv_iter() {
        Ok(iter) => collect_pairs(iter, ".env"),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(AutomationError::InvalidArgument(format!(
            "Cannot read .env: {e}"
        ))),
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, AutomationError> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        AutomationError::InvalidArgument(format!("Cannot read {}: {e}", path.display()))
    })?;
    collect_pairs(iter, &path.display().to_string())
}

fn collect_pairs(
    iter: impl Iterator<Item = dotenvy::Result<(String, String)>>,
    origin: &str,
) -> Result<HashMap<String, String>, AutomationError> {
    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            AutomationError::InvalidArgument(format!("Malformed {origin}: {e}"))
        })?;
        values.insert(key, value);
    }
    Ok(values)
}

/// Portal login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Typed view over [`Config`]
#[derive(Debug, Clone)]
pub struct Settings {
    pub username: Option<String>,
    pub password: Option<String>,
    pub login_url: String,
    pub implicit_wait: Duration,
    pub page_load_timeout: Duration,
    pub headless: bool,
    pub webdriver_url: String,
    pub submit_delay_enabled: bool,
    pub submit_delay_min: Duration,
    pub submit_delay_max: Duration,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self, AutomationError> {
        let submit_delay_min = config.get_secs("SUBMIT_DELAY_MIN", 1)?;
        let submit_delay_max = config.get_secs("SUBMIT_DELAY_MAX", 10)?;
        if submit_delay_min > submit_delay_max {
            return Err(AutomationError::InvalidArgument(format!(
                "SUBMIT_DELAY_MIN ({submit_delay_min:?}) exceeds SUBMIT_DELAY_MAX ({submit_delay_max:?})"
            )));
        }
        let log_file = config.get("LOG_FILE", "logs/punchclock.log");

        Ok(Self {
            username: config.get_opt("WW_USERNAME"),
            password: config.get_opt("WW_PASSWORD"),
            login_url: config.get("LOGIN_URL", DEFAULT_LOGIN_URL),
            implicit_wait: config.get_secs("IMPLICIT_WAIT", 10)?,
            page_load_timeout: config.get_secs("PAGE_LOAD_TIMEOUT", 30)?,
            headless: config.get_bool("HEADLESS", false),
            webdriver_url: config.get("WEBDRIVER_URL", "http://localhost:9515"),
            submit_delay_enabled: config.get_bool("SUBMIT_DELAY_ENABLED", true),
            submit_delay_min,
            submit_delay_max,
            log_level: config.get("LOG_LEVEL", "INFO"),
            log_file: (!log_file.eq_ignore_ascii_case("none")).then(|| PathBuf::from(log_file)),
        })
    }

    /// Both credentials, or `AuthenticationIncomplete`
    pub fn credentials(&self) -> Result<Credentials, AutomationError> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(AutomationError::AuthenticationIncomplete(
                "WW_USERNAME or WW_PASSWORD not found in environment or .env".to_string(),
            )),
        }
    }

    /// Wait used by the main flow for each locate attempt
    pub fn flow_wait(&self) -> Duration {
        self.implicit_wait.max(Duration::from_secs(15))
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            webdriver_url: self.webdriver_url.clone(),
            headless: self.headless,
            page_load_timeout: self.page_load_timeout,
            extra_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_dotenv_by_default() {
        let config = Config::from_sources(
            map(&[("HEADLESS", "true")]),
            map(&[("HEADLESS", "false"), ("IMPLICIT_WAIT", "7")]),
        );
        assert_eq!(config.get("HEADLESS", "x"), "true");
        assert_eq!(config.get("IMPLICIT_WAIT", "10"), "7");
        assert_eq!(config.get("MISSING", "fallback"), "fallback");
    }

    #[test]
    fn test_prefer_dotenv_flips_precedence() {
        let config = Config::from_sources(
            map(&[("HEADLESS", "true"), ("PREFER_DOTENV", "TRUE")]),
            map(&[("HEADLESS", "false")]),
        );
        assert_eq!(config.get("HEADLESS", "x"), "false");

        let from_file = Config::from_sources(
            map(&[("HEADLESS", "true")]),
            map(&[("HEADLESS", "false"), ("PREFER_DOTENV", "true")]),
        );
        assert_eq!(from_file.get("HEADLESS", "x"), "false");
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let config = Config::from_sources(
            map(&[("WW_USERNAME", "")]),
            map(&[("WW_USERNAME", "alice")]),
        );
        assert_eq!(config.get_opt("WW_USERNAME").as_deref(), Some("alice"));

        let both_empty = Config::from_sources(map(&[("K", "")]), map(&[("K", "")]));
        assert_eq!(both_empty.get("K", "d"), "d");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.implicit_wait, Duration::from_secs(10));
        assert_eq!(settings.page_load_timeout, Duration::from_secs(30));
        assert_eq!(settings.flow_wait(), Duration::from_secs(15));
        assert!(!settings.headless);
        assert_eq!(settings.login_url, DEFAULT_LOGIN_URL);
        assert_eq!(settings.submit_delay_min, Duration::from_secs(1));
        assert_eq!(settings.submit_delay_max, Duration::from_secs(10));
        assert_eq!(settings.log_file, Some(PathBuf::from("logs/punchclock.log")));
    }

    #[test]
    fn test_missing_credentials_are_authentication_incomplete() {
        let config = Config::from_sources(map(&[("WW_USERNAME", "alice")]), HashMap::new());
        let settings = Settings::from_config(&config).unwrap();
        assert!(matches!(
            settings.credentials(),
            Err(AutomationError::AuthenticationIncomplete(_))
        ));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let config = Config::from_sources(
            map(&[("WW_USERNAME", "alice"), ("WW_PASSWORD", "hunter2")]),
            HashMap::new(),
        );
        let credentials = Settings::from_config(&config).unwrap().credentials().unwrap();
        let debug = format!("{credentials:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_bad_number_names_the_key() {
        let config = Config::from_sources(map(&[("IMPLICIT_WAIT", "soon")]), HashMap::new());
        let err = Settings::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("IMPLICIT_WAIT"));
    }

    #[test]
    fn test_load_reads_explicit_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.env");
        std::fs::write(&path, "PUNCHCLOCK_TEST_ONLY_KEY=from-file\n").unwrap();
        let values = read_dotenv(&path).unwrap();
        assert_eq!(
            values.get("PUNCHCLOCK_TEST_ONLY_KEY").map(String::as_str),
            Some("from-file")
        );
    }
}
