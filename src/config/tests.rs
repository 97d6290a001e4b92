use clap::Parser;

use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.admin_addr.to_string(), "127.0.0.1:3001");
    assert_eq!(settings.storage.root, PathBuf::from("data"));
    assert_eq!(settings.storage.read_timeout, Duration::from_secs(2));
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.default_ttl, Duration::from_secs(3600));
    assert_eq!(settings.cache.max_entry_bytes.get(), 5 * 1024 * 1024);
    assert_eq!(settings.cache.operation_timeout, Duration::from_millis(250));
    assert_eq!(settings.delivery.max_age, Duration::from_secs(300));
    assert!(settings.admin.cache_clear_secret.is_none());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.default_ttl_seconds = Some(60);

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_default_ttl_seconds: Some(120),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.default_ttl, Duration::from_secs(120));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.default_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.default_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn zero_max_age_is_allowed() {
    let mut raw = RawSettings::default();
    raw.delivery.max_age_seconds = Some(0);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.delivery.max_age, Duration::ZERO);
}

#[test]
fn listeners_must_not_collide() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(3000);

    let err = Settings::from_raw(raw).expect_err("shared address");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "server.admin_port",
            ..
        }
    ));
}

#[test]
fn blank_secret_leaves_invalidation_open() {
    let mut raw = RawSettings::default();
    raw.admin.cache_clear_secret = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.admin.cache_clear_secret.is_none());
}

#[test]
fn secret_is_redacted_from_debug_output() {
    let admin = AdminSettings {
        cache_clear_secret: Some("hunter2".to_string()),
    };
    let rendered = format!("{admin:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["manifestd"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "manifestd",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--storage-root",
        "/srv/manifests",
        "--cache-enabled",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.storage.storage_root.as_deref(),
                Some(std::path::Path::new("/srv/manifests"))
            );
            assert_eq!(serve.overrides.cache_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_inspect_arguments() {
    let args = CliArgs::parse_from(["manifestd", "inspect", "--storage-root", "/tmp/m", "--json"]);

    match args.command.expect("inspect command") {
        Command::Inspect(inspect) => {
            assert!(inspect.json);
            let mut raw = RawSettings::default();
            raw.apply_storage_override(&inspect.storage);
            let settings = Settings::from_raw(raw).expect("valid settings");
            assert_eq!(settings.storage.root, PathBuf::from("/tmp/m"));
        }
        _ => panic!("wrong command parsed"),
    }
}
