use clap::Parser;
use roku_driver::cli::commands::{cmd_info, cmd_press};
use roku_driver::cli::config::{Cli, Commands, log_filter, resolve_settings};
use roku_driver::config::{DriverSettings, TypingMode, load_config};
use roku_driver::session::capabilities::Capabilities;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_press_keys() {
    let cli = Cli::parse_from(["roku-driver", "press", "Home", "Down", "Select"]);
    match cli.command {
        Commands::Press { keys } => assert_eq!(keys, vec!["Home", "Down", "Select"]),
        _ => panic!("Expected Press command"),
    }
}

#[test]
fn cli_parse_press_requires_a_key() {
    assert!(Cli::try_parse_from(["roku-driver", "press"]).is_err());
}

#[test]
fn cli_parse_find_all() {
    let cli = Cli::parse_from(["roku-driver", "find", "//Button", "--all"]);
    match cli.command {
        Commands::Find { xpath, all } => {
            assert_eq!(xpath, "//Button");
            assert!(all);
        }
        _ => panic!("Expected Find command"),
    }
}

#[test]
fn cli_parse_type_text() {
    let cli = Cli::parse_from(["roku-driver", "type", "//Keyboard", "hello world"]);
    match cli.command {
        Commands::Type { xpath, text } => {
            assert_eq!(xpath, "//Keyboard");
            assert_eq!(text, "hello world");
        }
        _ => panic!("Expected Type command"),
    }
}

#[test]
fn cli_parse_launch_deep_link() {
    let cli = Cli::parse_from([
        "roku-driver",
        "launch",
        "12",
        "--content-id",
        "tt0111161",
        "--media-type",
        "movie",
    ]);
    match cli.command {
        Commands::Launch {
            app_id,
            content_id,
            media_type,
        } => {
            assert_eq!(app_id, "12");
            assert_eq!(content_id.as_deref(), Some("tt0111161"));
            assert_eq!(media_type.as_deref(), Some("movie"));
        }
        _ => panic!("Expected Launch command"),
    }
}

#[test]
fn cli_parse_launch_content_id_needs_media_type() {
    let result = Cli::try_parse_from(["roku-driver", "launch", "12", "--content-id", "tt0111161"]);
    assert!(result.is_err());
}

#[test]
fn cli_parse_screenshot_default_output() {
    let cli = Cli::parse_from(["roku-driver", "screenshot"]);
    match cli.command {
        Commands::Screenshot { output } => assert_eq!(output, "screenshot.png"),
        _ => panic!("Expected Screenshot command"),
    }
}

#[test]
fn cli_parse_session_with_app() {
    let cli = Cli::parse_from(["roku-driver", "session", "--app", "build/channel.zip"]);
    match cli.command {
        Commands::Session { app } => assert_eq!(app.as_deref(), Some("build/channel.zip")),
        _ => panic!("Expected Session command"),
    }
}

#[test]
fn cli_parse_global_flags_after_subcommand() {
    let cli = Cli::parse_from([
        "roku-driver",
        "info",
        "--host",
        "192.168.1.40",
        "--password",
        "hunter2",
        "-vv",
    ]);
    assert!(matches!(cli.command, Commands::Info));
    assert_eq!(cli.host.as_deref(), Some("192.168.1.40"));
    assert_eq!(cli.password.as_deref(), Some("hunter2"));
    assert_eq!(cli.verbose, 2);
}

#[test]
fn log_filter_levels() {
    assert_eq!(log_filter(0), "warn");
    assert_eq!(log_filter(1), "info");
    assert_eq!(log_filter(2), "debug");
    assert_eq!(log_filter(7), "trace");
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    assert_eq!(config.device.ecp_port, 8060);
    assert_eq!(config.navigation.max_focus_moves, 30);
}

#[test]
fn config_default_values() {
    let config = DriverSettings::default();
    assert!(config.device.host.is_none());
    assert_eq!(config.device.ecp_port, 8060);
    assert_eq!(config.device.web_port, 80);
    assert_eq!(config.device.user, "rokudev");
    assert_eq!(config.protocol.read_retries, 2);
    assert_eq!(config.navigation.settle_delay_ms, 400);
    assert_eq!(config.navigation.key_cooldown_ms, 0);
    assert_eq!(config.cache.capacity, 2048);
    assert_eq!(config.navigation.typing_mode, TypingMode::Ecp);
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
device:
  host: "10.0.0.7"
navigation:
  max_focus_moves: 50
  typing_mode: keyboard
"#;
    let config: DriverSettings = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.device.host.as_deref(), Some("10.0.0.7"));
    assert_eq!(config.navigation.max_focus_moves, 50);
    assert_eq!(config.navigation.typing_mode, TypingMode::Keyboard);
    // Unset fields keep their defaults
    assert_eq!(config.device.ecp_port, 8060);
    assert_eq!(config.navigation.settle_delay_ms, 400);
    assert_eq!(config.protocol.request_timeout_ms, 10_000);
}

#[test]
fn config_malformed_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join(format!("roku-driver-bad-{}.yaml", std::process::id()));
    std::fs::write(&path, "device: [not, a, map").unwrap();
    let config = load_config(path.to_str());
    assert_eq!(config.device.ecp_port, 8060);
    std::fs::remove_file(&path).ok();
}

#[test]
fn resolve_settings_cli_overrides_file() {
    let path = std::env::temp_dir().join(format!("roku-driver-cli-{}.yaml", std::process::id()));
    std::fs::write(&path, "device:\n  host: \"10.0.0.7\"\n  password: \"from-file\"\n").unwrap();

    let cli = Cli::parse_from([
        "roku-driver",
        "--config",
        path.to_str().unwrap(),
        "--host",
        "10.0.0.9",
        "--trace",
        "nav.jsonl",
        "source",
    ]);
    let settings = resolve_settings(&cli);
    assert_eq!(settings.device.host.as_deref(), Some("10.0.0.9"));
    assert_eq!(settings.device.password.as_deref(), Some("from-file"));
    assert_eq!(settings.navigation.trace_file.as_deref(), Some("nav.jsonl"));

    std::fs::remove_file(&path).ok();
}

#[test]
fn capabilities_override_settings() {
    let mut settings = DriverSettings::default();
    let caps = Capabilities {
        roku_host: Some("10.0.0.3".into()),
        roku_ecp_port: Some(9000),
        roku_pass: Some("pw".into()),
        key_cooldown: Some(120),
        max_focus_moves: Some(8),
        settle_delay: Some(50),
        typing_mode: Some(TypingMode::Keyboard),
        ..Capabilities::default()
    };
    settings.apply_capabilities(&caps);

    assert_eq!(settings.device.host.as_deref(), Some("10.0.0.3"));
    assert_eq!(settings.device.ecp_port, 9000);
    assert_eq!(settings.device.web_port, 80);
    assert_eq!(settings.device.password.as_deref(), Some("pw"));
    assert_eq!(settings.navigation.key_cooldown_ms, 120);
    assert_eq!(settings.navigation.max_focus_moves, 8);
    assert_eq!(settings.navigation.settle_delay_ms, 50);
    assert_eq!(settings.navigation.typing_mode, TypingMode::Keyboard);
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn press_rejects_unknown_key_before_connecting() {
    let settings = DriverSettings::default();
    let err = cmd_press(&settings, &["Home".to_string(), "Warp".to_string()]).unwrap_err();
    assert!(err.to_string().contains("Warp"), "{}", err);
}

#[test]
fn query_without_host_fails() {
    let settings = DriverSettings::default();
    assert!(cmd_info(&settings).is_err());
}
