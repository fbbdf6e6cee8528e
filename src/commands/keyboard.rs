use tracing::debug;

use crate::driver::DriverContext;
use crate::ecp::keys::RokuKey;
use crate::error::{DriverError, Result};
use crate::ui::node::UiNode;
use crate::ui::snapshot::Snapshot;

/// SceneGraph components that draw an on-screen keyboard.
pub const KEYBOARD_TAGS: &[&str] = &[
    "Keyboard",
    "MiniKeyboard",
    "DynamicKeyboard",
    "DynamicMiniKeyboard",
    "PinPad",
    "DynamicPinPad",
];

/// First visible on-screen keyboard in document order.
pub fn find_keyboard(snapshot: &Snapshot) -> Option<&UiNode> {
    snapshot
        .nodes()
        .into_iter()
        .find(|n| n.is_visible() && KEYBOARD_TAGS.contains(&n.tag.as_str()))
}

/// The key inside `keyboard` labelled with `ch`. An exact label wins over a
/// case-insensitive one; a space matches a key labelled "space".
pub fn find_key(keyboard: &UiNode, ch: char) -> Option<&UiNode> {
    let wanted = ch.to_string();
    let keys: Vec<&UiNode> = keyboard
        .descendants()
        .into_iter()
        .filter(|n| n.is_visible())
        .collect();

    let exact = keys.iter().find(|n| key_label(n) == Some(wanted.as_str()));
    let loose = || {
        keys.iter().find(|n| match key_label(n) {
            Some(label) => label.eq_ignore_ascii_case(&wanted) || (ch == ' ' && label.eq_ignore_ascii_case("space")),
            None => false,
        })
    };
    exact.or_else(loose).copied()
}

fn key_label(node: &UiNode) -> Option<&str> {
    node.text().map(str::trim)
}

/// Type `text` on the keyboard already on screen: for every character,
/// navigate focus onto its key and press Select.
pub fn type_on_keyboard(ctx: &mut DriverContext, text: &str) -> Result<()> {
    for ch in text.chars() {
        let snapshot = ctx.capture()?;
        let keyboard = find_keyboard(&snapshot).ok_or_else(|| DriverError::NoSuchElement {
            selector: "on-screen keyboard".to_string(),
        })?;
        let key = find_key(keyboard, ch).ok_or_else(|| DriverError::NoSuchElement {
            selector: format!("keyboard key '{}'", ch),
        })?;

        let outcome = ctx.navigator().move_focus_to(key)?;
        debug!(key = %ch, moves = outcome.moves, "keyboard key focused");
        ctx.client.press_key(&RokuKey::Select)?;
    }
    Ok(())
}
