use reverb::ReverbConfig;
use reverb_error::ConfigErrorKind;
use reverb_rate_limit::{KeyedBy, QuotaTable};
use std::io::Write;
use std::path::PathBuf;

#[test]
fn test_bundled_defaults_load() {
    let config = ReverbConfig::from_sources(None, false, false).expect("defaults load");

    assert_eq!(*config.limiter().rpm(), 60);
    assert_eq!(*config.pool().cooldown_secs(), 70);
    assert_eq!(config.pool().env_var(), "GEMINI_API");
    assert_eq!(config.generation().model(), "gemini-2.0-flash-lite");
    assert_eq!(*config.generation().workers(), 5);
    assert_eq!(*config.collect().target_count(), 50);
    assert_eq!(config.paths().base_dir(), &PathBuf::from("tmp"));
}

#[test]
fn test_bundled_quotas_match_builtin_table() {
    let config = ReverbConfig::from_sources(None, false, false).expect("defaults load");
    assert_eq!(config.quotas(), &QuotaTable::default());

    let (service, limits) = config
        .quotas()
        .lookup("gemini", "generate", Some("gemini-2.5-pro"))
        .expect("known model");
    assert_eq!(*service.keyed_by(), KeyedBy::Model);
    assert_eq!(*limits.rpm(), 5);
    assert_eq!(*limits.rpd(), Some(100));

    let (_, write) = config
        .quotas()
        .lookup("sheets", "write", None)
        .expect("known method");
    assert_eq!(*write.rpm(), 60);
    assert_eq!(*write.rpd(), None);
}

#[test]
fn test_user_file_overrides_defaults() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        r#"
[paths]
base_dir = "/srv/reverb"

[pool]
cooldown_secs = 120

[quotas.gemini.limits]
"gemini-9-test" = {{ rpm = 2 }}
"#
    )
    .expect("write config");

    let config = ReverbConfig::from_sources(Some(file.path()), true, false).expect("config loads");

    assert_eq!(*config.pool().cooldown_secs(), 120);
    // Untouched keys in the same section keep their defaults.
    assert_eq!(config.pool().env_var(), "GEMINI_API");
    assert_eq!(
        config.paths().replies_queue("alice"),
        PathBuf::from("/srv/reverb/replies-x/alice/schedule.json")
    );

    let (_, added) = config
        .quotas()
        .lookup("gemini", "generate", Some("gemini-9-test"))
        .expect("added model");
    assert_eq!(*added.rpm(), 2);
    assert!(
        config
            .quotas()
            .lookup("gemini", "generate", Some("gemini-2.0-flash-lite"))
            .is_ok()
    );
}

#[test]
fn test_missing_required_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");

    let err = ReverbConfig::from_sources(Some(&missing), true, false).unwrap_err();
    assert!(matches!(err.kind(), ConfigErrorKind::Load(_)));
    assert!(err.to_string().contains("Failed to load configuration"));

    assert!(ReverbConfig::from_sources(Some(&missing), false, false).is_ok());
}

#[test]
fn test_malformed_value_is_an_error() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(file, "[limiter]\nrpm = \"fast\"").expect("write config");

    let err = ReverbConfig::from_sources(Some(file.path()), true, false).unwrap_err();
    assert!(matches!(err.kind(), ConfigErrorKind::Invalid(_)));
    assert!(err.to_string().contains("Invalid configuration"));
}

#[test]
fn test_zero_quota_is_rejected() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        r#"
[quotas.gemini.limits]
"gemini-2.0-flash-lite" = {{ rpm = 0 }}
"#
    )
    .expect("write config");

    let err = ReverbConfig::from_sources(Some(file.path()), true, false).unwrap_err();
    match err.kind() {
        ConfigErrorKind::QuotaTable(reason) => {
            assert!(reason.contains("gemini/gemini-2.0-flash-lite allows 0 requests per minute"))
        }
        other => panic!("unexpected kind: {other}"),
    }
}

#[test]
fn test_empty_base_dir_is_rejected() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(file, "[paths]
base_dir = \"\"").expect("write config");

    let err = ReverbConfig::from_sources(Some(file.path()), true, false).unwrap_err();
    assert!(matches!(err.kind(), ConfigErrorKind::Path { .. }));
}
