#![allow(clippy::unwrap_used)]
// Round-trip of config files through the figment layers.

use std::time::Duration;

use pretty_assertions::assert_eq;

use strmdeck_config::{
    Config, Profile, load_config_from, profile_to_session_config, save_config_to,
};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert_eq!(cfg.defaults.output, "table");
    assert_eq!(cfg.defaults.timeout, 10);
    assert!(cfg.profiles.is_empty());
}

#[test]
fn saved_profiles_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    let mut nas = Profile::new("http://nas.local:8000");
    nas.stats_refresh = Some(60);
    cfg.profiles.insert("default".into(), nas);
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded, cfg);

    let profile = loaded.profile(loaded.profile_name(None)).unwrap();
    let session = profile_to_session_config(profile, &loaded.defaults).unwrap();
    assert_eq!(session.server.as_str(), "http://nas.local:8000/");
    assert_eq!(session.stats_refresh, Duration::from_secs(60));
    assert_eq!(session.retry.timeout, Duration::from_secs(10));
}

#[test]
fn hand_written_file_fills_missing_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "office"

[defaults]
output = "json"

[profiles.office]
server = "https://strm.example.com"
insecure = true
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();

    assert_eq!(cfg.defaults.output, "json");
    assert_eq!(cfg.defaults.color, "auto");
    let office = cfg.profile("office").unwrap();
    assert_eq!(office.insecure, Some(true));
    assert_eq!(office.push_path, None);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "profiles = 3").unwrap();

    assert!(load_config_from(&path).is_err());
}
