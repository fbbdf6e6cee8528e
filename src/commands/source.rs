use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::driver::{DriverContext, NATIVE_CONTEXT};
use crate::error::{DriverError, Result};

/// Raw app-ui XML. Re-fetched only after an input reached the device.
pub fn get_page_source(ctx: &mut DriverContext) -> Result<String> {
    let snapshot = ctx.cached_capture()?;
    Ok(snapshot.source.clone())
}

/// Base64 of the image the developer web server produced.
pub fn get_screenshot(ctx: &mut DriverContext) -> Result<String> {
    let shot = ctx.client.screenshot()?;
    debug!(format = ?shot.format, bytes = shot.bytes.len(), "screenshot captured");
    Ok(STANDARD.encode(&shot.bytes))
}

pub fn get_current_context(ctx: &DriverContext) -> String {
    ctx.current_context.clone()
}

/// Only the native context exists on this platform.
pub fn get_contexts() -> Vec<String> {
    vec![NATIVE_CONTEXT.to_string()]
}

pub fn set_context(ctx: &mut DriverContext, name: &str) -> Result<()> {
    if name != NATIVE_CONTEXT {
        return Err(DriverError::NoSuchContext(name.to_string()));
    }
    ctx.current_context = name.to_string();
    Ok(())
}
