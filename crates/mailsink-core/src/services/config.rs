/// Configuration service - loads config from environment variables
use crate::error::MailsinkError;
use crate::models::{MailsinkConfig, RelayProfile};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads and validates configuration from the process environment
pub fn load_from_env() -> Result<MailsinkConfig, MailsinkError> {
    load_with(|key| std::env::var(key).ok())
}

/// Loads configuration through an arbitrary variable lookup
pub fn load_with<F>(lookup: F) -> Result<MailsinkConfig, MailsinkError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = MailsinkConfig::default();
    let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let config = MailsinkConfig {
        api_bind_addr: text("MAILSINK_API_BIND_ADDR").unwrap_or(defaults.api_bind_addr),
        hostname: text("MAILSINK_HOSTNAME").unwrap_or(defaults.hostname),
        web_path: text("MAILSINK_WEB_PATH").unwrap_or_default(),
        cors_origin: text("MAILSINK_CORS_ORIGIN"),
        keepalive_secs: parse_var(&lookup, "MAILSINK_KEEPALIVE_SECS", defaults.keepalive_secs)?,
        queue_bound: parse_var(&lookup, "MAILSINK_QUEUE_BOUND", defaults.queue_bound)?,
        subscriber_buffer: parse_var(
            &lookup,
            "MAILSINK_SUBSCRIBER_BUFFER",
            defaults.subscriber_buffer,
        )?,
        write_timeout_ms: parse_var(
            &lookup,
            "MAILSINK_WRITE_TIMEOUT_MS",
            defaults.write_timeout_ms,
        )?,
        ping_secs: parse_var(&lookup, "MAILSINK_PING_SECS", defaults.ping_secs)?,
        relay_timeout_secs: parse_var(
            &lookup,
            "MAILSINK_RELAY_TIMEOUT_SECS",
            defaults.relay_timeout_secs,
        )?,
        outgoing_smtp: text("MAILSINK_OUTGOING_SMTP").map(PathBuf::from),
    };

    // Validate configuration
    config
        .validate()
        .map_err(|e| MailsinkError::Config(format!("Invalid configuration: {}", e)))?;

    tracing::info!("Configuration validated successfully");

    Ok(config)
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, MailsinkError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MailsinkError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

/// Reads pre-configured relay profiles: a JSON object of name → profile.
///
/// The map key wins over any `Name` field inside the profile.
pub fn load_relay_profiles(path: &Path) -> Result<Vec<RelayProfile>, MailsinkError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        MailsinkError::Config(format!(
            "Unable to read outgoing SMTP file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_relay_profiles(&raw)
}

pub fn parse_relay_profiles(raw: &str) -> Result<Vec<RelayProfile>, MailsinkError> {
    let profiles: BTreeMap<String, RelayProfile> = serde_json::from_str(raw)
        .map_err(|e| MailsinkError::Config(format!("Invalid outgoing SMTP JSON: {}", e)))?;

    Ok(profiles
        .into_iter()
        .map(|(name, mut profile)| {
            profile.name = name;
            profile
        })
        .collect())
}
