use crate::constants::*;
use crate::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding [`BackendConfig::api_base_url`].
pub const ENV_API_URL: &str = "PARKWATCH_API_URL";
/// Environment variable overriding [`BackendConfig::ai_base_url`].
pub const ENV_AI_URL: &str = "PARKWATCH_AI_URL";
/// Environment variable overriding [`RealtimeConfig::url`].
pub const ENV_REALTIME_URL: &str = "PARKWATCH_REALTIME_URL";

/// Main configuration for Parkwatch.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParkwatchConfig {
    /// REST backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Realtime event channel configuration.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Session persistence configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// REST backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL every REST path is resolved against.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL of the AI prediction / report chat service.
    #[serde(default = "default_ai_base_url")]
    pub ai_base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Realtime event channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeConfig {
    /// Server URL (http, https, ws or wss).
    #[serde(default = "default_realtime_url")]
    pub url: String,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Reconnect delay ceiling in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Reconnect attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Connect timeout in seconds.
    #[serde(default = "default_realtime_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whether incoming events are relayed when the client starts.
    #[serde(default = "default_live_updates")]
    pub live_updates: bool,
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionConfig {
    /// Session file path. Falls back to the platform config dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ParkwatchConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::FileSystem(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Parse(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::FileSystem(format!("Failed to write config file: {}", e)))
    }

    /// Resolve the configuration: explicit file, else the default file when it
    /// exists, else built-in defaults. Environment overrides apply last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config(format!(
                        "Configuration file not found: {}",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "loading configuration");
                Self::load(path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    debug!(path = %path.display(), "loading default configuration");
                    Self::load(&path)?
                }
                _ => {
                    debug!("no configuration file, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            debug!(var = ENV_API_URL, "environment override");
            self.backend.api_base_url = url;
        }
        if let Some(url) = lookup(ENV_AI_URL).filter(|v| !v.trim().is_empty()) {
            debug!(var = ENV_AI_URL, "environment override");
            self.backend.ai_base_url = url;
        }
        if let Some(url) = lookup(ENV_REALTIME_URL).filter(|v| !v.trim().is_empty()) {
            debug!(var = ENV_REALTIME_URL, "environment override");
            self.realtime.url = url;
        }
    }

    /// Check the configuration for values the clients cannot work with.
    pub fn validate(&self) -> Result<()> {
        check_url("backend.api_base_url", &self.backend.api_base_url, &["http", "https"])?;
        check_url("backend.ai_base_url", &self.backend.ai_base_url, &["http", "https"])?;
        check_url(
            "realtime.url",
            &self.realtime.url,
            &["http", "https", "ws", "wss"],
        )?;

        if self.backend.request_timeout_secs == 0 {
            return Err(Error::validation("backend.request_timeout_secs must be > 0"));
        }
        if self.backend.connect_timeout_secs == 0 {
            return Err(Error::validation("backend.connect_timeout_secs must be > 0"));
        }
        if self.realtime.connect_timeout_secs == 0 {
            return Err(Error::validation("realtime.connect_timeout_secs must be > 0"));
        }
        if self.realtime.base_delay_ms == 0 {
            return Err(Error::validation("realtime.base_delay_ms must be > 0"));
        }
        if self.realtime.base_delay_ms > self.realtime.max_delay_ms {
            return Err(Error::validation(
                "realtime.base_delay_ms must not exceed realtime.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Session file path: configured, else `<config_dir>/parkwatch/session.json`.
    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session.path {
            return Ok(path.clone());
        }
        app_config_dir()
            .map(|dir| dir.join("session.json"))
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))
    }
}

/// `<config_dir>/parkwatch`, when the platform has a config dir.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// `<config_dir>/parkwatch/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|dir| dir.join("config.toml"))
}

fn check_url(field: &str, value: &str, schemes: &[&str]) -> Result<()> {
    let trimmed = value.trim();
    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return Err(Error::validation(format!("{} is not a URL: {:?}", field, value)));
    };
    if !schemes.contains(&scheme.to_ascii_lowercase().as_str()) {
        return Err(Error::validation(format!(
            "{} must use one of {:?}, got {:?}",
            field, schemes, scheme
        )));
    }
    if rest.trim_matches('/').is_empty() {
        return Err(Error::validation(format!("{} has no host: {:?}", field, value)));
    }
    Ok(())
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            ai_base_url: default_ai_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_realtime_url(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
            connect_timeout_secs: default_realtime_connect_timeout(),
            live_updates: default_live_updates(),
        }
    }
}

// Default values
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_ai_base_url() -> String {
    DEFAULT_AI_BASE_URL.to_string()
}

fn default_realtime_url() -> String {
    DEFAULT_REALTIME_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_base_delay() -> u64 {
    DEFAULT_RECONNECT_BASE_DELAY_MS
}

fn default_max_delay() -> u64 {
    DEFAULT_RECONNECT_MAX_DELAY_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_RECONNECT_MAX_ATTEMPTS
}

fn default_realtime_connect_timeout() -> u64 {
    DEFAULT_REALTIME_CONNECT_TIMEOUT_SECS
}

fn default_live_updates() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ParkwatchConfig::from_toml(
            r#"
            [backend]
            api_base_url = "https://parking.example.com/api/"

            [realtime]
            max_attempts = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.api_base_url, "https://parking.example.com/api/");
        assert_eq!(config.backend.ai_base_url, DEFAULT_AI_BASE_URL);
        assert_eq!(config.realtime.max_attempts, 8);
        assert_eq!(config.realtime.base_delay_ms, 1_000);
        assert_eq!(config.realtime.max_delay_ms, 30_000);
        assert!(config.realtime.live_updates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_replace_urls() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://10.0.0.5:1313/api/"),
            (ENV_REALTIME_URL, "ws://10.0.0.5:1313"),
            (ENV_AI_URL, "  "),
        ]);
        let mut config = ParkwatchConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.api_base_url, "http://10.0.0.5:1313/api/");
        assert_eq!(config.realtime.url, "ws://10.0.0.5:1313");
        assert_eq!(config.backend.ai_base_url, DEFAULT_AI_BASE_URL);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ParkwatchConfig::default();
        config.backend.api_base_url = "localhost:1313".to_string();
        assert!(matches!(config.validate(), Err(Error::Validation(_))));

        let mut config = ParkwatchConfig::default();
        config.realtime.url = "ftp://host".to_string();
        assert!(config.validate().is_err());

        let mut config = ParkwatchConfig::default();
        config.realtime.base_delay_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = ParkwatchConfig::default();
        config.backend.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load_preserves_session_path() {
        let dir = std::env::temp_dir().join(format!("parkwatch_config_{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut config = ParkwatchConfig::default();
        config.session.path = Some(dir.join("session.json"));

        config.save(&path).unwrap();
        let loaded = ParkwatchConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.session_path().unwrap(), dir.join("session.json"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("parkwatch_definitely_missing.toml");
        assert!(matches!(
            ParkwatchConfig::resolve(Some(&path)),
            Err(Error::Config(_))
        ));
    }
}
