use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub email: EmailConfig,
    pub dialog: DialogConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Outbound search-index cluster (OpenSearch-compatible HTTP API).
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub base_url: String,
    pub index: String,
    pub username: String,
    pub password: SecretString,
    pub timeout_secs: u64,
}

/// Outbound transactional-mail HTTP API.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: SecretString,
    pub sender: String,
    pub subject: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DialogConfig {
    /// Fixed UTC offset, in hours, used to derive "today" for date
    /// validation. Threaded into the validator explicitly; nothing mutates
    /// process-wide timezone state.
    pub timezone_offset_hours: i32,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub batch_size: usize,
    pub idle_backoff_ms: u64,
    pub max_idle_backoff_ms: u64,
    pub visibility_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub search_base_url: Option<String>,
    pub email_api_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://concierge.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8088,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            search: SearchConfig {
                base_url: "http://localhost:9200".to_string(),
                index: "restaurants".to_string(),
                username: String::new(),
                password: String::new().into(),
                timeout_secs: 10,
            },
            email: EmailConfig {
                api_url: "http://localhost:8825/v1/messages".to_string(),
                api_key: String::new().into(),
                sender: "Concierge <no-reply@concierge.local>".to_string(),
                subject: "Your dining suggestion".to_string(),
                timeout_secs: 10,
            },
            dialog: DialogConfig { timezone_offset_hours: -5 },
            worker: WorkerConfig {
                batch_size: 10,
                idle_backoff_ms: 250,
                max_idle_backoff_ms: 5_000,
                visibility_timeout_secs: 60,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    search: Option<SearchPatch>,
    email: Option<EmailPatch>,
    dialog: Option<DialogPatch>,
    worker: Option<WorkerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchPatch {
    base_url: Option<String>,
    index: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmailPatch {
    api_url: Option<String>,
    api_key: Option<String>,
    sender: Option<String>,
    subject: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DialogPatch {
    timezone_offset_hours: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkerPatch {
    batch_size: Option<usize>,
    idle_backoff_ms: Option<u64>,
    max_idle_backoff_ms: Option<u64>,
    visibility_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(search) = patch.search {
            if let Some(base_url) = search.base_url {
                self.search.base_url = base_url;
            }
            if let Some(index) = search.index {
                self.search.index = index;
            }
            if let Some(username) = search.username {
                self.search.username = username;
            }
            if let Some(password) = search.password {
                self.search.password = password.into();
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(email) = patch.email {
            if let Some(api_url) = email.api_url {
                self.email.api_url = api_url;
            }
            if let Some(api_key) = email.api_key {
                self.email.api_key = api_key.into();
            }
            if let Some(sender) = email.sender {
                self.email.sender = sender;
            }
            if let Some(subject) = email.subject {
                self.email.subject = subject;
            }
            if let Some(timeout_secs) = email.timeout_secs {
                self.email.timeout_secs = timeout_secs;
            }
        }

        if let Some(dialog) = patch.dialog {
            if let Some(timezone_offset_hours) = dialog.timezone_offset_hours {
                self.dialog.timezone_offset_hours = timezone_offset_hours;
            }
        }

        if let Some(worker) = patch.worker {
            if let Some(batch_size) = worker.batch_size {
                self.worker.batch_size = batch_size;
            }
            if let Some(idle_backoff_ms) = worker.idle_backoff_ms {
                self.worker.idle_backoff_ms = idle_backoff_ms;
            }
            if let Some(max_idle_backoff_ms) = worker.max_idle_backoff_ms {
                self.worker.max_idle_backoff_ms = max_idle_backoff_ms;
            }
            if let Some(visibility_timeout_secs) = worker.visibility_timeout_secs {
                self.worker.visibility_timeout_secs = visibility_timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_number("CONCIERGE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_PORT") {
            self.server.port = parse_number("CONCIERGE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_SEARCH_BASE_URL") {
            self.search.base_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_SEARCH_INDEX") {
            self.search.index = value;
        }
        if let Some(value) = read_env("CONCIERGE_SEARCH_USERNAME") {
            self.search.username = value;
        }
        if let Some(value) = read_env("CONCIERGE_SEARCH_PASSWORD") {
            self.search.password = value.into();
        }
        if let Some(value) = read_env("CONCIERGE_EMAIL_API_URL") {
            self.email.api_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_EMAIL_API_KEY") {
            self.email.api_key = value.into();
        }
        if let Some(value) = read_env("CONCIERGE_EMAIL_SENDER") {
            self.email.sender = value;
        }
        if let Some(value) = read_env("CONCIERGE_DIALOG_TIMEZONE_OFFSET_HOURS") {
            self.dialog.timezone_offset_hours =
                parse_number("CONCIERGE_DIALOG_TIMEZONE_OFFSET_HOURS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CONCIERGE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(search_base_url) = overrides.search_base_url {
            self.search.base_url = search_base_url;
        }
        if let Some(email_api_url) = overrides.email_api_url {
            self.email.api_url = email_api_url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.search.index.trim().is_empty() {
            return Err(ConfigError::Validation("search.index must not be empty".to_string()));
        }
        if self.email.sender.trim().is_empty() {
            return Err(ConfigError::Validation("email.sender must not be empty".to_string()));
        }
        if !(-12..=14).contains(&self.dialog.timezone_offset_hours) {
            return Err(ConfigError::Validation(format!(
                "dialog.timezone_offset_hours must lie in [-12, 14], got {}",
                self.dialog.timezone_offset_hours
            )));
        }
        if self.worker.batch_size == 0 {
            return Err(ConfigError::Validation(
                "worker.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = read_env("CONCIERGE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from("concierge.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_validate() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults should load");
        assert_eq!(config.search.index, "restaurants");
        assert_eq!(config.dialog.timezone_offset_hours, -5);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://patched.db\"\n\n[search]\nindex = \"eateries\"\n\n[dialog]\ntimezone_offset_hours = 1"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect("config should load");

        assert_eq!(config.database.url, "sqlite://patched.db");
        assert_eq!(config.search.index, "eateries");
        assert_eq!(config.dialog.timezone_offset_hours, 1);
        // Untouched sections keep their defaults.
        assert_eq!(config.server.health_check_port, 8080);
    }

    #[test]
    fn programmatic_overrides_win_over_file_values() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[database]\nurl = \"sqlite://from-file.db\"").expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");

        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let missing = PathBuf::from("/definitely/not/here/concierge.toml");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing file should fail");

        assert!(matches!(error, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[databse]\nurl = \"sqlite://typo.db\"").expect("write config");

        let error = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect_err("typo section should fail");

        assert!(matches!(error, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn out_of_range_timezone_offset_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[dialog]\ntimezone_offset_hours = 99").expect("write config");

        let error = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect_err("offset 99 should fail");

        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
