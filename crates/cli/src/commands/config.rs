use secrecy::ExposeSecret;

use concierge_core::config::{AppConfig, LoadOptions, LogFormat};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("configuration issue: {error}"),
    };

    let mut lines = Vec::new();
    lines.push(format!("database.url = {}", config.database.url));
    lines.push(format!("database.max_connections = {}", config.database.max_connections));
    lines.push(format!("database.timeout_secs = {}", config.database.timeout_secs));
    lines.push(format!("server.bind_address = {}", config.server.bind_address));
    lines.push(format!("server.port = {}", config.server.port));
    lines.push(format!("server.health_check_port = {}", config.server.health_check_port));
    lines.push(format!("search.base_url = {}", config.search.base_url));
    lines.push(format!("search.index = {}", config.search.index));
    lines.push(format!("search.username = {}", config.search.username));
    lines.push(format!("search.password = {}", redact(config.search.password.expose_secret())));
    lines.push(format!("email.api_url = {}", config.email.api_url));
    lines.push(format!("email.api_key = {}", redact(config.email.api_key.expose_secret())));
    lines.push(format!("email.sender = {}", config.email.sender));
    lines.push(format!("email.subject = {}", config.email.subject));
    lines.push(format!(
        "dialog.timezone_offset_hours = {}",
        config.dialog.timezone_offset_hours
    ));
    lines.push(format!("worker.batch_size = {}", config.worker.batch_size));
    lines.push(format!("worker.idle_backoff_ms = {}", config.worker.idle_backoff_ms));
    lines.push(format!(
        "worker.visibility_timeout_secs = {}",
        config.worker.visibility_timeout_secs
    ));
    lines.push(format!("logging.level = {}", config.logging.level));
    lines.push(format!(
        "logging.format = {}",
        match config.logging.format {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    ));
    lines.join("\n")
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(unset)"
    } else {
        "***redacted***"
    }
}
