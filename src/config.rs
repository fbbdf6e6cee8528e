use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::capabilities::Capabilities;

pub const DEFAULT_CONFIG_FILE: &str = "roku-driver.yaml";
pub const HOST_ENV_VAR: &str = "ROKU_HOST";

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `roku-driver.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriverSettings {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub protocol: ProtocolSettings,
    #[serde(default)]
    pub navigation: NavigationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub host: Option<String>,

    #[serde(default = "default_ecp_port")]
    pub ecp_port: u16,

    #[serde(default = "default_web_port")]
    pub web_port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    /// Developer web server password; needed for install and screenshots
    pub password: Option<String>,

    /// Override for the HTTP Host header
    pub header_host: Option<String>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            host: None,
            ecp_port: 8060,
            web_port: 80,
            user: "rokudev".to_string(),
            password: None,
            header_host: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Extra attempts for idempotent reads; inputs are never retried
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            read_retries: 2,
            retry_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSettings {
    #[serde(default = "default_max_focus_moves")]
    pub max_focus_moves: usize,

    /// Pause after every key press
    #[serde(default)]
    pub key_cooldown_ms: u64,

    /// Pause between a navigation move and the next UI capture
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// JSONL file receiving one line per navigation step
    pub trace_file: Option<String>,

    /// How `set_value` enters text
    #[serde(default)]
    pub typing_mode: TypingMode,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            max_focus_moves: 30,
            key_cooldown_ms: 0,
            settle_delay_ms: 400,
            trace_file: None,
            typing_mode: TypingMode::default(),
        }
    }
}

/// Text entry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingMode {
    /// One `Lit_` keypress per character
    #[default]
    Ecp,
    /// Open the on-screen keyboard and select each key by focus navigation
    Keyboard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: 2048 }
    }
}

// Serde default helpers
fn default_ecp_port() -> u16 { 8060 }
fn default_web_port() -> u16 { 80 }
fn default_user() -> String { "rokudev".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_read_retries() -> u32 { 2 }
fn default_backoff_ms() -> u64 { 250 }
fn default_max_focus_moves() -> usize { 30 }
fn default_settle_delay_ms() -> u64 { 400 }
fn default_cache_capacity() -> usize { 2048 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> DriverSettings {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring malformed config '{}': {}", config_path, e);
            DriverSettings::default()
        }),
        Err(_) => DriverSettings::default(),
    }
}

impl DriverSettings {
    /// Fill the device host from `ROKU_HOST` when nothing else set it.
    pub fn with_env_host(mut self) -> Self {
        if self.device.host.is_none() {
            self.device.host = std::env::var(HOST_ENV_VAR).ok().filter(|h| !h.trim().is_empty());
        }
        self
    }

    /// Session capabilities take precedence over file settings.
    pub fn apply_capabilities(&mut self, caps: &Capabilities) {
        if let Some(host) = &caps.roku_host {
            self.device.host = Some(host.clone());
        }
        if let Some(port) = caps.roku_ecp_port {
            self.device.ecp_port = port;
        }
        if let Some(port) = caps.roku_web_port {
            self.device.web_port = port;
        }
        if let Some(user) = &caps.roku_user {
            self.device.user = user.clone();
        }
        if let Some(pass) = &caps.roku_pass {
            self.device.password = Some(pass.clone());
        }
        if let Some(header_host) = &caps.roku_header_host {
            self.device.header_host = Some(header_host.clone());
        }
        if let Some(cooldown) = caps.key_cooldown {
            self.navigation.key_cooldown_ms = cooldown;
        }
        if let Some(max) = caps.max_focus_moves {
            self.navigation.max_focus_moves = max;
        }
        if let Some(delay) = caps.settle_delay {
            self.navigation.settle_delay_ms = delay;
        }
        if let Some(mode) = caps.typing_mode {
            self.navigation.typing_mode = mode;
        }
    }
}
