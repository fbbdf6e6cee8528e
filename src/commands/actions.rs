use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::driver::DriverContext;
use crate::ecp::keys::RokuKey;
use crate::error::{DriverError, Result};

// ============================================================================
// W3C action payload
// ============================================================================

#[derive(Debug, Deserialize)]
struct ActionSequence {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    actions: Vec<ActionItem>,
}

#[derive(Debug, Deserialize)]
struct ActionItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
}

/// One validated step, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Down(RokuKey),
    Up(RokuKey),
    Pause(Duration),
}

/// Map a W3C key value to a remote key. Single code points in the WebDriver
/// private-use range cover the navigation keys; other single characters are
/// typed as literals. Longer values are taken as remote key names.
pub fn w3c_key_to_roku(value: &str) -> Result<RokuKey> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(match c {
            '\u{E003}' | '\u{E017}' => RokuKey::Backspace,
            '\u{E006}' | '\u{E007}' => RokuKey::Select,
            '\u{E00C}' => RokuKey::Back,
            '\u{E011}' => RokuKey::Home,
            '\u{E012}' => RokuKey::Left,
            '\u{E013}' => RokuKey::Up,
            '\u{E014}' => RokuKey::Right,
            '\u{E015}' => RokuKey::Down,
            '\u{E000}'..='\u{F8FF}' => {
                return Err(DriverError::InvalidArgument(format!(
                    "key U+{:04X} has no remote equivalent",
                    c as u32
                )));
            }
            printable => RokuKey::Literal(printable),
        }),
        (None, _) => Err(DriverError::InvalidArgument("empty key value".into())),
        _ => value.parse(),
    }
}

/// Parse `actions` (the bare array or a `{"actions": [...]}` body) into key
/// steps. Pointer and wheel input cannot be expressed with a remote.
pub fn parse_actions(actions: &Value) -> Result<Vec<KeyAction>> {
    let list = actions.get("actions").unwrap_or(actions);
    let sequences: Vec<ActionSequence> = serde_json::from_value(list.clone())
        .map_err(|e| DriverError::InvalidArgument(format!("bad action sequence: {}", e)))?;

    let mut steps = Vec::new();
    for sequence in sequences {
        match sequence.kind.as_str() {
            "key" | "none" => {}
            other => {
                return Err(DriverError::InvalidArgument(format!(
                    "'{}' input source{} is not supported on this device",
                    other,
                    sequence.id.map(|id| format!(" '{}'", id)).unwrap_or_default()
                )));
            }
        }
        for item in sequence.actions {
            steps.push(parse_item(&sequence.kind, item)?);
        }
    }
    Ok(steps)
}

fn parse_item(source: &str, item: ActionItem) -> Result<KeyAction> {
    match (source, item.kind.as_str()) {
        (_, "pause") => Ok(KeyAction::Pause(Duration::from_millis(item.duration.unwrap_or(0)))),
        ("key", "keyDown") => Ok(KeyAction::Down(w3c_key_to_roku(&required_value(&item)?)?)),
        ("key", "keyUp") => Ok(KeyAction::Up(w3c_key_to_roku(&required_value(&item)?)?)),
        (_, other) => Err(DriverError::InvalidArgument(format!(
            "action '{}' is not valid for a '{}' source",
            other, source
        ))),
    }
}

fn required_value(item: &ActionItem) -> Result<String> {
    item.value
        .clone()
        .ok_or_else(|| DriverError::InvalidArgument(format!("'{}' action needs a value", item.kind)))
}

/// Validate the whole payload, then replay it. Literals are typed on key
/// down; their key up is a no-op.
pub fn perform_actions(ctx: &mut DriverContext, actions: &Value) -> Result<()> {
    let steps = parse_actions(actions)?;
    debug!(steps = steps.len(), "performing actions");

    for step in steps {
        match step {
            KeyAction::Down(key @ RokuKey::Literal(_)) => ctx.client.press_key(&key)?,
            KeyAction::Up(RokuKey::Literal(_)) => {}
            KeyAction::Down(key) => ctx.client.key_down(&key)?,
            KeyAction::Up(key) => ctx.client.key_up(&key)?,
            KeyAction::Pause(duration) => {
                if !duration.is_zero() {
                    thread::sleep(duration);
                }
            }
        }
    }
    Ok(())
}
