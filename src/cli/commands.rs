use crate::cache::element_cache::ElementHandle;
use crate::commands::{device, element, source};
use crate::config::DriverSettings;
use crate::driver::{AutomationDriver, DriverContext, RokuDriver};
use crate::ecp::client::EcpClient;
use crate::ecp::keys::RokuKey;
use crate::locator::query::XPATH_STRATEGY;
use crate::session::capabilities::Capabilities;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// query subcommands
// ============================================================================

pub fn cmd_info(settings: &DriverSettings) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    print_json(&device::device_info(&mut ctx)?)
}

pub fn cmd_apps(settings: &DriverSettings) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    for app in device::apps(&mut ctx)? {
        println!(
            "{:>8}  {:<12} {:<10} {}",
            app.id,
            app.kind.as_deref().unwrap_or("-"),
            app.version.as_deref().unwrap_or("-"),
            app.name
        );
    }
    Ok(())
}

pub fn cmd_active_app(settings: &DriverSettings) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    print_json(&device::active_app(&mut ctx)?)
}

pub fn cmd_player(settings: &DriverSettings) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    print_json(&device::player_state(&mut ctx)?)
}

pub fn cmd_source(settings: &DriverSettings) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    println!("{}", source::get_page_source(&mut ctx)?);
    Ok(())
}

// ============================================================================
// input subcommands
// ============================================================================

/// Press keys in order. All names are validated before the first press.
pub fn cmd_press(settings: &DriverSettings, keys: &[String]) -> CmdResult<()> {
    let parsed = keys
        .iter()
        .map(|k| k.parse::<RokuKey>())
        .collect::<Result<Vec<_>, _>>()?;
    let client = EcpClient::from_settings(settings)?;
    for key in &parsed {
        client.press_key(key)?;
    }
    Ok(())
}

pub fn cmd_launch(
    settings: &DriverSettings,
    app_id: &str,
    content_id: Option<&str>,
    media_type: Option<&str>,
) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    match (content_id, media_type) {
        (Some(content), Some(media)) => device::deep_link(&mut ctx, app_id, content, media)?,
        _ => device::activate_app(&mut ctx, app_id, &[])?,
    }
    println!("Launched {}", app_id);
    Ok(())
}

pub fn cmd_install(settings: &DriverSettings, archive: &str) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    device::install_app(&mut ctx, archive)?;
    println!("Installed {}", archive);
    Ok(())
}

pub fn cmd_screenshot(settings: &DriverSettings, output: &str) -> CmdResult<()> {
    let client = EcpClient::from_settings(settings)?;
    let shot = client.screenshot()?;
    std::fs::write(output, &shot.bytes)?;
    println!("Wrote {} ({} bytes, {:?})", output, shot.bytes.len(), shot.format);
    Ok(())
}

// ============================================================================
// element subcommands
// ============================================================================

pub fn cmd_find(settings: &DriverSettings, xpath: &str, all: bool) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    let handles = if all {
        element::find_elements(&mut ctx, XPATH_STRATEGY, xpath, None)?
    } else {
        vec![element::find_element(&mut ctx, XPATH_STRATEGY, xpath, None)?]
    };
    for handle in &handles {
        print_element(&mut ctx, handle)?;
    }
    Ok(())
}

fn print_element(ctx: &mut DriverContext, handle: &ElementHandle) -> CmdResult<()> {
    let path = element::get_attribute(ctx, handle, "path")?.unwrap_or_default();
    let text = element::get_text(ctx, handle)?;
    if text.is_empty() {
        println!("{}", path);
    } else {
        println!("{}  \"{}\"", path, text);
    }
    Ok(())
}

pub fn cmd_focus(settings: &DriverSettings, xpath: &str) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    let handle = element::find_element(&mut ctx, XPATH_STRATEGY, xpath, None)?;
    let outcome = element::focus_element(&mut ctx, &handle)?;
    println!("Focused {} after {} moves", xpath, outcome.moves);
    Ok(())
}

pub fn cmd_click(settings: &DriverSettings, xpath: &str) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    let handle = element::find_element(&mut ctx, XPATH_STRATEGY, xpath, None)?;
    element::click(&mut ctx, &handle)?;
    Ok(())
}

pub fn cmd_type(settings: &DriverSettings, xpath: &str, text: &str) -> CmdResult<()> {
    let mut ctx = DriverContext::from_settings(settings)?;
    let handle = element::find_element(&mut ctx, XPATH_STRATEGY, xpath, None)?;
    element::set_value(&mut ctx, &handle, text)?;
    Ok(())
}

// ============================================================================
// session subcommand
// ============================================================================

/// Start a full session and end it again. Exercises install, launch and
/// teardown against a real device.
pub fn cmd_session(settings: &DriverSettings, app: Option<&str>, verbose: u8) -> CmdResult<()> {
    let mut caps = Capabilities {
        platform_name: Some("Roku".to_string()),
        roku_host: settings.device.host.clone(),
        ..Capabilities::default()
    };
    caps.app = app.map(str::to_string);

    let driver = RokuDriver::create_session(caps, settings.clone())?;
    println!("Session {} active", driver.session_id());

    if verbose > 0 {
        print_json(&driver.active_app()?)?;
    }

    driver.delete_session();
    println!("Session ended");
    Ok(())
}
