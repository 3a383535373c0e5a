//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.chatter/config.json`) and environment.
//! Every field has a default, so an empty object or a missing file is a valid config.

use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Chat server location.
    #[serde(default)]
    pub server: ServerConfig,

    /// Front-end rendering options.
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where the chat is served from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Origin of the chat page (default "http://localhost:8080"). The WebSocket scheme follows it:
    /// https -> wss, http -> ws. Overridden by CHATTER_ORIGIN env.
    #[serde(default = "default_origin")]
    pub origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    /// Play the new-message cue (default true).
    #[serde(default = "default_true")]
    pub sound: bool,

    /// chrono format string for message times, rendered in local time.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_time_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            sound: default_true(),
            time_format: default_time_format(),
        }
    }
}

/// Resolve the page origin: env CHATTER_ORIGIN overrides config.
pub fn resolve_origin(config: &Config) -> String {
    std::env::var("CHATTER_ORIGIN")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.server.origin.trim().to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CHATTER_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".chatter").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, CHATTER_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    check_time_format(&config.ui.time_format)
        .with_context(|| format!("invalid ui.timeFormat in {}", path.display()))?;
    Ok((config, path))
}

/// Reject format strings chrono cannot render; formatting with one fails at display time.
pub fn check_time_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("unsupported time format {:?}", format);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.origin, "http://localhost:8080");
        assert!(config.ui.sound);
        assert_eq!(config.ui.time_format, "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn camel_case_keys() {
        let config: Config = serde_json::from_str(
            r#"{"server":{"origin":"https://chat.example.org"},"ui":{"sound":false,"timeFormat":"%H:%M"}}"#,
        )
        .unwrap();
        assert_eq!(config.server.origin, "https://chat.example.org");
        assert!(!config.ui.sound);
        assert_eq!(config.ui.time_format, "%H:%M");
    }

    #[test]
    fn missing_file_is_default() {
        let path = std::env::temp_dir().join("chatter-config-test-missing").join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.server.origin, "http://localhost:8080");
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = std::env::temp_dir().join(format!("chatter-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        assert!(format!("{:#}", err).contains(&path.display().to_string()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_time_format_reports_path() {
        let dir = std::env::temp_dir().join(format!("chatter-config-fmt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"ui":{"timeFormat":"%Q"}}"#).unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains(&path.display().to_string()));
        assert!(msg.contains("%Q"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn time_format_check() {
        assert!(check_time_format(&default_time_format()).is_ok());
        assert!(check_time_format("%H:%M").is_ok());
        assert!(check_time_format("%Q").is_err());
    }
}
