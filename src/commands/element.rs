use std::sync::Arc;

use tracing::debug;

use crate::cache::element_cache::ElementHandle;
use crate::config::TypingMode;
use crate::driver::DriverContext;
use crate::ecp::keys::RokuKey;
use crate::error::{DriverError, Result};
use crate::focus::navigator::NavigationOutcome;
use crate::locator::query::Query;
use crate::locator::resolver::{resolve, resolve_from};
use crate::ui::node::Bounds;
use crate::ui::snapshot::Snapshot;

use super::keyboard;

// ============================================================================
// Lookup
// ============================================================================

/// All matches in document order. The selector is validated before the
/// device is contacted.
pub fn find_elements(
    ctx: &mut DriverContext,
    strategy: &str,
    selector: &str,
    from: Option<&ElementHandle>,
) -> Result<Vec<ElementHandle>> {
    let query = Query::for_strategy(strategy, selector)?;
    let snapshot = ctx.cached_capture()?;

    let nodes = match from {
        Some(parent) => {
            let context = ctx.cache.resolve_handle(parent, &snapshot)?;
            resolve_from(&query, &snapshot, context)
        }
        None => resolve(&query, &snapshot),
    };
    debug!(selector = %query, matches = nodes.len(), "find elements");

    Ok(nodes
        .into_iter()
        .map(|node| ctx.cache.intern(node, snapshot.generation))
        .collect())
}

pub fn find_element(
    ctx: &mut DriverContext,
    strategy: &str,
    selector: &str,
    from: Option<&ElementHandle>,
) -> Result<ElementHandle> {
    find_elements(ctx, strategy, selector, from)?
        .into_iter()
        .next()
        .ok_or_else(|| DriverError::NoSuchElement {
            selector: selector.to_string(),
        })
}

/// The deepest node on the focus chain.
pub fn active_element(ctx: &mut DriverContext) -> Result<ElementHandle> {
    let snapshot = ctx.capture()?;
    let focused = snapshot.focused().ok_or_else(|| DriverError::NoSuchElement {
        selector: "active element".to_string(),
    })?;
    Ok(ctx.cache.intern(focused, snapshot.generation))
}

// ============================================================================
// Interaction
// ============================================================================

/// Re-validate `handle` against a fresh capture. Every interaction calls this
/// right before acting so a handle that went stale mid-command is refused.
pub fn element_interaction_guard(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<Arc<Snapshot>> {
    let snapshot = ctx.capture()?;
    ctx.cache.resolve_handle(handle, &snapshot)?;
    Ok(snapshot)
}

pub fn focus_element(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<NavigationOutcome> {
    let snapshot = ctx.capture()?;
    let target = ctx.cache.resolve_handle(handle, &snapshot)?;
    ctx.navigator().move_focus_to(target)
}

pub fn click(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<()> {
    focus_element(ctx, handle)?;
    element_interaction_guard(ctx, handle)?;
    ctx.client.press_key(&RokuKey::Select)
}

/// Focus the element and enter `text` the way the session's typing mode
/// says.
pub fn set_value(ctx: &mut DriverContext, handle: &ElementHandle, text: &str) -> Result<()> {
    match ctx.typing {
        TypingMode::Ecp => set_value_by_ecp(ctx, handle, text),
        TypingMode::Keyboard => set_value_by_keyboard(ctx, handle, text),
    }
}

/// Focus the element and type `text` one literal at a time.
pub fn set_value_by_ecp(ctx: &mut DriverContext, handle: &ElementHandle, text: &str) -> Result<()> {
    focus_element(ctx, handle)?;
    element_interaction_guard(ctx, handle)?;
    ctx.client.send_text(text)
}

/// Focus the element, press Select to bring up the on-screen keyboard, then
/// pick each character's key by focus navigation.
pub fn set_value_by_keyboard(ctx: &mut DriverContext, handle: &ElementHandle, text: &str) -> Result<()> {
    focus_element(ctx, handle)?;
    element_interaction_guard(ctx, handle)?;
    ctx.client.press_key(&RokuKey::Select)?;
    keyboard::type_on_keyboard(ctx, text)
}

/// Focus the element and press Backspace once per character of its text.
pub fn clear(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<()> {
    focus_element(ctx, handle)?;
    let snapshot = element_interaction_guard(ctx, handle)?;
    let length = ctx
        .cache
        .resolve_handle(handle, &snapshot)?
        .text()
        .map(|t| t.chars().count())
        .unwrap_or(0);

    for _ in 0..length {
        ctx.client.press_key(&RokuKey::Backspace)?;
    }
    Ok(())
}

// ============================================================================
// Inspection
// ============================================================================

pub fn get_text(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<String> {
    let snapshot = element_interaction_guard(ctx, handle)?;
    Ok(ctx.cache.resolve_handle(handle, &snapshot)?.visible_text())
}

/// A raw attribute. `path` and `tag` are synthesised from the node itself.
pub fn get_attribute(ctx: &mut DriverContext, handle: &ElementHandle, name: &str) -> Result<Option<String>> {
    let snapshot = element_interaction_guard(ctx, handle)?;
    let node = ctx.cache.resolve_handle(handle, &snapshot)?;
    Ok(match name {
        "path" => Some(node.path.to_string()),
        "tag" => Some(node.tag.clone()),
        _ => node.attribute(name).map(str::to_string),
    })
}

pub fn get_tag_name(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<String> {
    let snapshot = element_interaction_guard(ctx, handle)?;
    Ok(ctx.cache.resolve_handle(handle, &snapshot)?.tag.clone())
}

/// `None` when the device reported no bounds for the element.
pub fn get_element_rect(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<Option<Bounds>> {
    let snapshot = element_interaction_guard(ctx, handle)?;
    Ok(ctx.cache.resolve_handle(handle, &snapshot)?.bounds)
}

pub fn is_displayed(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<bool> {
    let snapshot = element_interaction_guard(ctx, handle)?;
    Ok(ctx.cache.resolve_handle(handle, &snapshot)?.is_visible())
}

pub fn is_focused(ctx: &mut DriverContext, handle: &ElementHandle) -> Result<bool> {
    let snapshot = element_interaction_guard(ctx, handle)?;
    let node = ctx.cache.resolve_handle(handle, &snapshot)?;
    Ok(snapshot.focused().map(|f| f.path == node.path).unwrap_or(false) || node.is_focused())
}
