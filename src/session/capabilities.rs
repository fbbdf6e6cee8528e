use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::TypingMode;
use crate::error::{DriverError, Result};

/// App identity meaning "already sideloaded, skip install".
pub const DEV_APP_ID: &str = "dev";

/// Capabilities a session is created with.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub platform_name: Option<String>,
    #[serde(default)]
    pub roku_host: Option<String>,
    #[serde(default)]
    pub roku_ecp_port: Option<u16>,
    #[serde(default)]
    pub roku_web_port: Option<u16>,
    #[serde(default)]
    pub roku_user: Option<String>,
    #[serde(default)]
    pub roku_pass: Option<String>,
    #[serde(default)]
    pub roku_header_host: Option<String>,
    /// Milliseconds to wait after each key press
    #[serde(default)]
    pub key_cooldown: Option<u64>,
    /// Zip to sideload, or `dev` when the channel is already installed
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub max_focus_moves: Option<usize>,
    /// Milliseconds between a navigation move and the next capture
    #[serde(default)]
    pub settle_delay: Option<u64>,
    /// `ecp` or `keyboard`
    #[serde(default)]
    pub typing_mode: Option<TypingMode>,
}

impl Capabilities {
    /// Accept either a flat caps object or a W3C `{alwaysMatch, firstMatch}`
    /// envelope. Vendor prefixes such as `appium:` are stripped.
    pub fn from_w3c(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| DriverError::InvalidArgument("capabilities must be a JSON object".into()))?;

        let mut merged = Map::new();
        if object.contains_key("alwaysMatch") || object.contains_key("firstMatch") {
            if let Some(Value::Object(always)) = object.get("alwaysMatch") {
                merge_stripped(&mut merged, always);
            }
            if let Some(Value::Array(first)) = object.get("firstMatch") {
                if let Some(Value::Object(candidate)) = first.first() {
                    merge_stripped(&mut merged, candidate);
                }
            }
        } else {
            merge_stripped(&mut merged, object);
        }

        serde_json::from_value(Value::Object(merged))
            .map_err(|e| DriverError::InvalidArgument(format!("bad capabilities: {}", e)))
    }

    /// The app to sideload, if any. `dev` and an absent app both mean no.
    pub fn app_to_install(&self) -> Option<&str> {
        self.app.as_deref().filter(|app| *app != DEV_APP_ID)
    }

    pub fn validate(&self) -> Result<()> {
        if self
            .roku_host
            .as_deref()
            .map(|h| h.trim().is_empty())
            .unwrap_or(true)
        {
            return Err(DriverError::InvalidArgument(
                "the 'rokuHost' capability is required".into(),
            ));
        }
        if matches!(self.app.as_deref(), Some(app) if app.trim().is_empty()) {
            return Err(DriverError::InvalidArgument("the 'app' capability is empty".into()));
        }
        Ok(())
    }
}

fn merge_stripped(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (key, value) in from {
        let bare = key.rsplit_once(':').map(|(_, k)| k).unwrap_or(key);
        into.insert(bare.to_string(), value.clone());
    }
}
