use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::driver::DriverContext;
use crate::error::{DriverError, Result};

use super::{device, element, keyboard, source};

const SCRIPT_PREFIX: &str = "roku:";

#[derive(Debug, Deserialize)]
struct KeyArgs {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppArgs {
    app_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallArgs {
    app_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeepLinkArgs {
    app_id: String,
    content_id: String,
    media_type: String,
}

#[derive(Debug, Deserialize)]
struct SelectArgs {
    #[serde(default = "default_select_attribute")]
    attribute: String,
    value: String,
}

fn default_select_attribute() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize)]
struct TextArgs {
    text: String,
}

#[derive(Debug, Deserialize)]
struct InputArgs {
    params: BTreeMap<String, String>,
}

/// Split `roku: pressKey` into `pressKey`. Anything without the prefix is
/// not a command this driver understands.
pub fn command_name(script: &str) -> Result<&str> {
    script
        .trim()
        .strip_prefix(SCRIPT_PREFIX)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DriverError::UnknownCommand(script.to_string()))
}

fn args<T: DeserializeOwned>(name: &str, args: &[Value]) -> Result<T> {
    let first = args.first().cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(first)
        .map_err(|e| DriverError::InvalidArgument(format!("bad arguments for 'roku: {}': {}", name, e)))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| DriverError::protocol("execute", e))
}

/// Dispatch a `roku: <name>` extension command.
pub fn execute(ctx: &mut DriverContext, script: &str, raw_args: &[Value]) -> Result<Value> {
    let name = command_name(script)?;
    debug!(command = name, "execute");

    match name {
        "pressKey" => {
            let a: KeyArgs = args(name, raw_args)?;
            device::press_key(ctx, &a.key)?;
            Ok(Value::Null)
        }
        "deviceInfo" => to_value(device::device_info(ctx)?),
        "getApps" => to_value(device::apps(ctx)?),
        "activeApp" => to_value(device::active_app(ctx)?),
        "appUI" => Ok(Value::String(device::app_ui(ctx)?)),
        "playerState" => to_value(device::player_state(ctx)?),
        "activateApp" => {
            let a: AppArgs = args(name, raw_args)?;
            device::activate_app(ctx, &a.app_id, &[])?;
            Ok(Value::Null)
        }
        "installApp" => {
            let a: InstallArgs = args(name, raw_args)?;
            device::install_app(ctx, &a.app_path)?;
            Ok(Value::Null)
        }
        "removeApp" => {
            let a: AppArgs = args(name, raw_args)?;
            device::remove_app(ctx, &a.app_id)?;
            Ok(Value::Null)
        }
        "isAppInstalled" => {
            let a: AppArgs = args(name, raw_args)?;
            Ok(Value::Bool(device::is_app_installed(ctx, &a.app_id)?))
        }
        "terminateApp" => {
            let a: AppArgs = args(name, raw_args)?;
            Ok(Value::Bool(device::terminate_app(ctx, &a.app_id)?))
        }
        "deepLink" => {
            let a: DeepLinkArgs = args(name, raw_args)?;
            device::deep_link(ctx, &a.app_id, &a.content_id, &a.media_type)?;
            Ok(Value::Null)
        }
        "ecpInput" => {
            let a: InputArgs = args(name, raw_args)?;
            let params: Vec<(String, String)> = a.params.into_iter().collect();
            device::ecp_input(ctx, &params)?;
            Ok(Value::Null)
        }
        "selectElement" => {
            let a: SelectArgs = args(name, raw_args)?;
            device::select_element(ctx, &a.attribute, &a.value)?;
            Ok(Value::Null)
        }
        "typeOnKeyboard" => {
            let a: TextArgs = args(name, raw_args)?;
            keyboard::type_on_keyboard(ctx, &a.text)?;
            Ok(Value::Null)
        }
        "activeElement" => to_value(element::active_element(ctx)?),
        "getSource" => Ok(Value::String(source::get_page_source(ctx)?)),
        "screenshot" => Ok(Value::String(source::get_screenshot(ctx)?)),
        _ => Err(DriverError::UnknownCommand(format!("roku: {}", name))),
    }
}
