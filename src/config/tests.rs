use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.network.timeout, Duration::from_secs(20));
    assert_eq!(settings.batch.asset_timeout, Duration::from_millis(5000));
    assert_eq!(settings.batch.asset_cache_entries, 64);
    assert_eq!(settings.batch.concurrency, 1);
    assert_eq!(settings.batch.missing, MissingPolicy::Empty);
    assert_eq!(settings.batch.page, 0);
    assert_eq!(settings.batch.output_dir, PathBuf::from("out"));
    assert_eq!(settings.batch.name_field, "name");
    assert_eq!(settings.batch.secondary_field.as_deref(), Some("price"));
    assert_eq!(settings.server.listen.to_string(), "127.0.0.1:8088");
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(settings.network.cors_proxy.is_none());
}

#[test]
fn default_impl_agrees_with_empty_raw_layer() {
    let built = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let default = Settings::default();

    assert_eq!(built.batch.concurrency, default.batch.concurrency);
    assert_eq!(built.batch.max_name_len, default.batch.max_name_len);
    assert_eq!(built.batch.asset_cache_entries, default.batch.asset_cache_entries);
    assert_eq!(built.server.listen, default.server.listen);
    assert_eq!(built.network.timeout, default.network.timeout);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.batch.concurrency = Some(2);
    raw.logging.level = Some("info".to_string());

    let overrides = BatchOverrides {
        concurrency: Some(4),
        missing: Some("na".to_string()),
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_batch_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.batch.concurrency, 4);
    assert_eq!(settings.batch.missing, MissingPolicy::NotAvailable);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn serve_listen_override() {
    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        listen: Some("0.0.0.0:9000".to_string()),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.listen.port(), 9000);
}

#[test]
fn proxies_are_built_from_bases() {
    let mut raw = RawSettings::default();
    raw.network.cors_proxy = Some("https://relay.example/?url=".into());
    raw.network.image_proxy = Some("https://resize.example/?url=".into());
    raw.network.image_proxy_trim = Some(10);

    let settings = Settings::from_raw(raw).expect("valid settings");
    let image_proxy = settings.network.image_proxy.expect("image proxy");
    assert_eq!(image_proxy.trim, Some(10));
    assert_eq!(
        settings.network.cors_proxy.expect("relay").wrap("http://a"),
        "https://relay.example/?url=http%3A%2F%2Fa"
    );
}

fn assert_rejected(expected_key: &str, mutate: impl FnOnce(&mut RawSettings)) {
    let mut raw = RawSettings::default();
    mutate(&mut raw);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, expected_key),
        other => panic!("{expected_key}: expected invalid, got {other:?}"),
    }
}

#[test]
fn invalid_values_are_rejected() {
    assert_rejected("batch.concurrency", |r| r.batch.concurrency = Some(0));
    assert_rejected("batch.missing", |r| r.batch.missing = Some("maybe".into()));
    assert_rejected("batch.pixel_ratio", |r| r.batch.pixel_ratio = Some(-1.0));
    assert_rejected("batch.asset_cache_entries", |r| r.batch.asset_cache_entries = Some(0));
    assert_rejected("network.timeout_secs", |r| r.network.timeout_secs = Some(0));
    assert_rejected("network.cors_proxy", |r| {
        r.network.cors_proxy = Some("not a url".into())
    });
    assert_rejected("server.listen", |r| r.server.listen = Some("nowhere".into()));
    assert_rejected("logging.level", |r| r.logging.level = Some("loud".into()));
}

#[test]
fn empty_secondary_field_disables_suffix() {
    let mut raw = RawSettings::default();
    raw.batch.secondary_field = Some("  ".into());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.batch.secondary_field, None);
}

#[test]
fn json_logging_flag() {
    let mut raw = RawSettings::default();
    raw.apply_logging_overrides(&LoggingOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn configured_rules_replace_builtin_set() {
    use crate::fill::Rule;

    let mut raw = RawSettings::default();
    raw.batch.rules = Some(RuleSet::new(vec![Rule::Tokens]));
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.batch.rules.rules(), &[Rule::Tokens]);

    assert_rejected("batch.rules", |r| r.batch.rules = Some(RuleSet::new(Vec::new())));
}
