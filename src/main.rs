use clap::Parser;
use tracing_subscriber::EnvFilter;

use roku_driver::cli::commands::{
    cmd_active_app, cmd_apps, cmd_click, cmd_find, cmd_focus, cmd_info, cmd_install, cmd_launch,
    cmd_player, cmd_press, cmd_screenshot, cmd_session, cmd_source, cmd_type,
};
use roku_driver::cli::config::{Cli, Commands, log_filter, resolve_settings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Resolve device settings: CLI > config > env > defaults
    let settings = resolve_settings(&cli);

    match &cli.command {
        Commands::Info => cmd_info(&settings)?,
        Commands::Apps => cmd_apps(&settings)?,
        Commands::ActiveApp => cmd_active_app(&settings)?,
        Commands::Player => cmd_player(&settings)?,
        Commands::Source => cmd_source(&settings)?,
        Commands::Press { keys } => cmd_press(&settings, keys)?,
        Commands::Find { xpath, all } => cmd_find(&settings, xpath, *all)?,
        Commands::Click { xpath } => cmd_click(&settings, xpath)?,
        Commands::Type { xpath, text } => cmd_type(&settings, xpath, text)?,
        Commands::Focus { xpath } => cmd_focus(&settings, xpath)?,
        Commands::Launch {
            app_id,
            content_id,
            media_type,
        } => cmd_launch(&settings, app_id, content_id.as_deref(), media_type.as_deref())?,
        Commands::Install { archive } => cmd_install(&settings, archive)?,
        Commands::Screenshot { output } => cmd_screenshot(&settings, output)?,
        Commands::Session { app } => cmd_session(&settings, app.as_deref(), cli.verbose)?,
    }

    Ok(())
}
