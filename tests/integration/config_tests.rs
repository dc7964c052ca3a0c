use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use folderize::config::{Config, ConfigError, ENV_PREFIX};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
output = "/srv/archive"
dirstruct = "%Y/%m-%B"
locale = "de-DE"
exclude = ["^\\.", "\\.tmp$"]
ignore = ["Thumbs.db"]
cache = true
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();

    assert_eq!(config.output, PathBuf::from("/srv/archive"));
    assert_eq!(config.dirstruct, "%Y/%m-%B");
    assert_eq!(config.locale, "de-DE");
    assert_eq!(config.exclude, vec!["^\\.", "\\.tmp$"]);
    assert_eq!(config.ignore, vec!["Thumbs.db"]);
    assert!(config.cache);
    assert!(!config.follow_symlinks);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("FOLDERIZE_FOLLOW_SYMLINKS", "true");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .unwrap();

    assert!(config.follow_symlinks);

    std::env::remove_var("FOLDERIZE_FOLLOW_SYMLINKS");
}

#[test]
fn test_config_malformed_file_is_load_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "cache = \"sometimes\"").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "locale = \"fr-FR\"").unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.locale, "fr-FR");
    assert_eq!(config.dirstruct, "%Y/%B/%e");
}
