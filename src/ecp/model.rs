use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;

use crate::ecp::xml::{attributes, parse_bool, parse_millis, tag_name};
use crate::error::{DriverError, Result};

// ============================================================================
// Apps
// ============================================================================

/// One entry of `/query/apps` or `/query/active-app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct AppInfo {
    /// Empty for the home screen entry of `/query/active-app`
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub name: String,
}

impl AppInfo {
    fn from_attributes(attrs: &BTreeMap<String, String>) -> Self {
        AppInfo {
            id: attrs.get("id").cloned().unwrap_or_default(),
            kind: attrs.get("type").cloned(),
            subtype: attrs.get("subtype").cloned(),
            version: attrs.get("version").cloned(),
            name: String::new(),
        }
    }
}

pub fn parse_apps(xml: &str) -> Result<Vec<AppInfo>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut apps = Vec::new();
    let mut current: Option<AppInfo> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = tag_name(&e);
                if name == "apps" {
                    saw_root = true;
                } else if name == "app" {
                    current = Some(AppInfo::from_attributes(&attributes(&e)?));
                }
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                if name == "apps" {
                    saw_root = true;
                } else if name == "app" {
                    apps.push(AppInfo::from_attributes(&attributes(&e)?));
                }
            }
            Event::Text(t) => {
                if let Some(app) = current.as_mut() {
                    app.name.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"app" {
                    if let Some(app) = current.take() {
                        apps.push(app);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(DriverError::protocol("/query/apps", "missing <apps> root"));
    }
    Ok(apps)
}

// ============================================================================
// Active app
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ActiveApp {
    pub app: Option<AppInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screensaver: Option<AppInfo>,
}

pub fn parse_active_app(xml: &str) -> Result<ActiveApp> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut active = ActiveApp::default();
    let mut saw_root = false;
    // (element name, entry being filled)
    let mut current: Option<(String, AppInfo)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = tag_name(&e);
                match name.as_str() {
                    "active-app" => saw_root = true,
                    "app" | "screensaver" => {
                        current = Some((name, AppInfo::from_attributes(&attributes(&e)?)));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                let info = AppInfo::from_attributes(&attributes(&e)?);
                match name.as_str() {
                    "app" => active.app = Some(info),
                    "screensaver" => active.screensaver = Some(info),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, info)) = current.as_mut() {
                    info.name.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                if let Some((name, info)) = current.take() {
                    if name == "screensaver" {
                        active.screensaver = Some(info);
                    } else {
                        active.app = Some(info);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(DriverError::protocol(
            "/query/active-app",
            "missing <active-app> root",
        ));
    }
    Ok(active)
}

// ============================================================================
// Device info
// ============================================================================

/// Flat `/query/device-info` document keyed by element name. Keys iterate
/// and serialize in sorted order, not document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(transparent)]
pub struct DeviceInfo {
    pub fields: BTreeMap<String, String>,
}

impl DeviceInfo {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn model_name(&self) -> Option<&str> {
        self.get("model-name")
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.get("serial-number")
    }

    pub fn software_version(&self) -> Option<&str> {
        self.get("software-version")
    }

    pub fn developer_enabled(&self) -> bool {
        self.get("developer-enabled")
            .and_then(parse_bool)
            .unwrap_or(false)
    }
}

pub fn parse_device_info(xml: &str) -> Result<DeviceInfo> {
    let fields = parse_leaf_fields(xml, "device-info")?;
    Ok(DeviceInfo { fields })
}

/// Collect `<root><leaf>text</leaf>...</root>` into a map.
fn parse_leaf_fields(xml: &str, root: &str) -> Result<BTreeMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut fields = BTreeMap::new();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = tag_name(&e);
                if stack.is_empty() && name == root {
                    saw_root = true;
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if stack.len() == 1 {
                    fields.entry(tag_name(&e)).or_insert_with(String::new);
                }
            }
            Event::Text(t) => {
                if stack.len() == 2 {
                    if let Some(name) = stack.last() {
                        fields.insert(name.clone(), t.unescape()?.to_string());
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(DriverError::protocol(
            format!("<{}>", root),
            format!("missing <{}> root", root),
        ));
    }
    Ok(fields)
}

// ============================================================================
// Media player
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct PlayerPlugin {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct PlayerState {
    /// "play", "pause", "buffer", "close", "none", ...
    pub state: String,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PlayerPlugin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    /// Every other leaf element and attribute-bearing child, flattened
    pub fields: BTreeMap<String, String>,
}

pub fn parse_player_state(xml: &str) -> Result<PlayerState> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut player = PlayerState::default();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = tag_name(&e);
                if stack.is_empty() && name == "player" {
                    saw_root = true;
                    apply_player_attributes(&mut player, &attributes(&e)?);
                } else if stack.len() == 1 {
                    apply_player_child(&mut player, &name, &attributes(&e)?);
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                if stack.is_empty() && name == "player" {
                    saw_root = true;
                    apply_player_attributes(&mut player, &attributes(&e)?);
                } else if stack.len() == 1 {
                    apply_player_child(&mut player, &name, &attributes(&e)?);
                }
            }
            Event::Text(t) => {
                if stack.len() == 2 {
                    let text = t.unescape()?.to_string();
                    match stack[1].as_str() {
                        "position" => player.position_ms = parse_millis(&text),
                        "duration" => player.duration_ms = parse_millis(&text),
                        "is_live" => player.is_live = parse_bool(&text),
                        other => {
                            player.fields.insert(other.to_string(), text);
                        }
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(DriverError::protocol(
            "/query/media-player",
            "missing <player> root",
        ));
    }
    Ok(player)
}

fn apply_player_attributes(player: &mut PlayerState, attrs: &BTreeMap<String, String>) {
    player.state = attrs.get("state").cloned().unwrap_or_default();
    player.error = attrs
        .get("error")
        .and_then(|v| parse_bool(v))
        .unwrap_or(false);
}

fn apply_player_child(player: &mut PlayerState, name: &str, attrs: &BTreeMap<String, String>) {
    if name == "plugin" {
        player.plugin = Some(PlayerPlugin {
            id: attrs.get("id").cloned().unwrap_or_default(),
            name: attrs.get("name").cloned(),
            bandwidth: attrs.get("bandwidth").cloned(),
        });
        return;
    }
    for (key, value) in attrs {
        player
            .fields
            .insert(format!("{}.{}", name, key), value.clone());
    }
}
