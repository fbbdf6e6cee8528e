use std::path::Path;

use tracing::info;

use crate::driver::DriverContext;
use crate::ecp::keys::RokuKey;
use crate::ecp::model::{ActiveApp, AppInfo, DeviceInfo, PlayerState};
use crate::ecp::transport::Method;
use crate::error::{DriverError, Result};
use crate::locator::query::Query;
use crate::locator::resolver::resolve_one;
use crate::session::capabilities::DEV_APP_ID;

use super::element;

// ============================================================================
// Remote keys
// ============================================================================

/// Press one named key. The name is checked before anything is sent.
pub fn press_key(ctx: &mut DriverContext, key: &str) -> Result<()> {
    let key: RokuKey = key.parse()?;
    ctx.client.press_key(&key)
}

pub fn ecp_input(ctx: &mut DriverContext, params: &[(String, String)]) -> Result<()> {
    ctx.client.input_params(params)
}

// ============================================================================
// Queries
// ============================================================================

pub fn device_info(ctx: &mut DriverContext) -> Result<DeviceInfo> {
    ctx.client.device_info()
}

pub fn apps(ctx: &mut DriverContext) -> Result<Vec<AppInfo>> {
    ctx.client.apps()
}

pub fn active_app(ctx: &mut DriverContext) -> Result<ActiveApp> {
    ctx.client.active_app()
}

pub fn player_state(ctx: &mut DriverContext) -> Result<PlayerState> {
    ctx.client.player_state()
}

pub fn app_ui(ctx: &mut DriverContext) -> Result<String> {
    ctx.client.app_ui()
}

pub fn is_app_installed(ctx: &mut DriverContext, app_id: &str) -> Result<bool> {
    Ok(ctx.client.apps()?.iter().any(|app| app.id == app_id))
}

// ============================================================================
// App lifecycle
// ============================================================================

/// Launch an app. Cached handles describe the old screen, so they are dropped.
pub fn activate_app(ctx: &mut DriverContext, app_id: &str, params: &[(String, String)]) -> Result<()> {
    ctx.client.launch(app_id, params)?;
    ctx.cache.clear();
    info!(app = app_id, "app activated");
    Ok(())
}

pub fn deep_link(ctx: &mut DriverContext, app_id: &str, content_id: &str, media_type: &str) -> Result<()> {
    if content_id.is_empty() || media_type.is_empty() {
        return Err(DriverError::InvalidArgument(
            "a deep link needs both contentId and mediaType".into(),
        ));
    }
    let params = [
        ("contentId".to_string(), content_id.to_string()),
        ("mediaType".to_string(), media_type.to_string()),
    ];
    activate_app(ctx, app_id, &params)
}

pub fn install_app(ctx: &mut DriverContext, archive: &str) -> Result<()> {
    let path = Path::new(archive);
    if !path.is_file() {
        return Err(DriverError::InvalidArgument(format!(
            "'{}' is not a readable file",
            archive
        )));
    }
    ctx.client.install(path)?;
    ctx.cache.clear();
    info!(archive, "sideloaded app installed");
    Ok(())
}

/// Only the sideloaded channel can be removed.
pub fn remove_app(ctx: &mut DriverContext, app_id: &str) -> Result<()> {
    if app_id != DEV_APP_ID {
        return Err(DriverError::InvalidArgument(format!(
            "only the '{}' app can be removed, not '{}'",
            DEV_APP_ID, app_id
        )));
    }
    ctx.client.remove_dev_app()?;
    ctx.cache.clear();
    Ok(())
}

/// Go home if `app_id` is in the foreground. Returns whether it was.
pub fn terminate_app(ctx: &mut DriverContext, app_id: &str) -> Result<bool> {
    let active = ctx.client.active_app()?;
    if active.app.as_ref().map(|app| app.id.as_str()) != Some(app_id) {
        return Ok(false);
    }
    ctx.client.press_key(&RokuKey::Home)?;
    ctx.cache.clear();
    Ok(true)
}

// ============================================================================
// Convenience
// ============================================================================

/// Click the first element whose `attribute` equals `value`.
pub fn select_element(ctx: &mut DriverContext, attribute: &str, value: &str) -> Result<()> {
    if attribute.is_empty() {
        return Err(DriverError::InvalidArgument("attribute name must not be empty".into()));
    }
    let query = Query::attribute_equals(attribute, value);
    let snapshot = ctx.capture()?;
    let node = resolve_one(&query, &snapshot)?;
    let handle = ctx.cache.intern(node, snapshot.generation);
    element::click(ctx, &handle)
}

/// Raw ECP call for anything the typed surface does not cover.
pub fn raw_ecp(ctx: &mut DriverContext, method: &str, path: &str, params: &[(String, String)]) -> Result<String> {
    let method = match method.to_ascii_uppercase().as_str() {
        "GET" => Method::Get,
        "POST" => Method::Post,
        other => {
            return Err(DriverError::InvalidArgument(format!(
                "unsupported ECP method '{}'",
                other
            )));
        }
    };
    if path.trim().is_empty() {
        return Err(DriverError::InvalidArgument("ECP path must not be empty".into()));
    }
    ctx.client.raw(method, path, params)
}
