use clap::{Parser, Subcommand};

use crate::config::{DriverSettings, load_config};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "roku-driver",
    version,
    about = "Drive a Roku device's UI over the External Control Protocol"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Device address (default: config file, then ROKU_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Developer web server password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// JSONL file that receives one line per navigation step
    #[arg(long, global = true)]
    pub trace: Option<String>,

    /// Path to config file (default: roku-driver.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print /query/device-info
    Info,

    /// List installed apps
    Apps,

    /// Show the foreground app
    ActiveApp,

    /// Show the media player state
    Player,

    /// Print the current UI tree as XML
    Source,

    /// Press one or more remote keys in order
    Press {
        /// Key names, e.g. Home Down Select Lit_a
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print the paths of elements matching an XPath
    Find {
        xpath: String,

        /// Print every match instead of the first
        #[arg(long)]
        all: bool,
    },

    /// Move focus to an element, then press Select
    Click { xpath: String },

    /// Move focus to an element, then type text into it
    Type { xpath: String, text: String },

    /// Move focus to an element
    Focus { xpath: String },

    /// Launch an app, optionally deep-linking into content
    Launch {
        app_id: String,

        #[arg(long, requires = "media_type")]
        content_id: Option<String>,

        #[arg(long, requires = "content_id")]
        media_type: Option<String>,
    },

    /// Sideload a zipped channel through the developer web server
    Install { archive: String },

    /// Save a screenshot of the sideloaded app
    Screenshot {
        #[arg(short, long, default_value = "screenshot.png")]
        output: String,
    },

    /// Start a session (install and launch when --app is set), then end it
    Session {
        /// Zip to sideload, or `dev` for an installed channel
        #[arg(long)]
        app: Option<String>,
    },
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Resolve settings: CLI > config file > environment > defaults.
pub fn resolve_settings(cli: &Cli) -> DriverSettings {
    let mut settings = load_config(cli.config.as_deref());
    if let Some(host) = &cli.host {
        settings.device.host = Some(host.clone());
    }
    if let Some(password) = &cli.password {
        settings.device.password = Some(password.clone());
    }
    if let Some(trace) = &cli.trace {
        settings.navigation.trace_file = Some(trace.clone());
    }
    settings.with_env_host()
}

/// Log filter for a `-v` count; RUST_LOG wins when set.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
