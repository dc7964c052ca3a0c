use clap::Parser;
use folderize::cli::Cli;
use folderize::error::ExitCode;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn cli(config: &NamedTempFile, args: &[&str]) -> Cli {
    let mut argv = vec![
        "folderize",
        "--quiet",
        "--config",
        config.path().to_str().unwrap(),
    ];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn test_run_app_copies_and_succeeds() {
    let config = NamedTempFile::new().unwrap();
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("a.txt"), b"a").unwrap();

    let code = folderize::run_app(cli(
        &config,
        &[
            "-i",
            src.path().to_str().unwrap(),
            "-o",
            dst.path().to_str().unwrap(),
            "-d",
            "%Y",
        ],
    ))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let years: Vec<_> = fs::read_dir(dst.path()).unwrap().collect();
    assert_eq!(years.len(), 1);
}

#[test]
fn test_run_app_verify_exit_code() {
    let config = NamedTempFile::new().unwrap();
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("a.txt"), b"a").unwrap();

    let code = folderize::run_app(cli(
        &config,
        &[
            "-i",
            src.path().to_str().unwrap(),
            "-o",
            dst.path().to_str().unwrap(),
            "--verify",
        ],
    ))
    .unwrap();

    assert_eq!(code, ExitCode::MissingFiles);
}

#[test]
fn test_run_app_uses_config_file() {
    let mut config = NamedTempFile::new().unwrap();
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("a.txt"), b"a").unwrap();
    writeln!(config, "output = {:?}", dst.path().to_str().unwrap()).unwrap();
    writeln!(config, "dirstruct = \"fixed\"").unwrap();

    let code =
        folderize::run_app(cli(&config, &["-i", src.path().to_str().unwrap()])).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(dst.path().join("fixed/a.txt").exists());
}

#[test]
fn test_run_app_rejects_invalid_template() {
    let config = NamedTempFile::new().unwrap();
    let src = TempDir::new().unwrap();

    let result = folderize::run_app(cli(
        &config,
        &["-i", src.path().to_str().unwrap(), "-d", "%Y/../%m"],
    ));

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid configuration"));
}

#[test]
fn test_run_app_missing_config_file_is_error() {
    let src = TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
        "folderize",
        "--quiet",
        "-i",
        src.path().to_str().unwrap(),
        "--config",
        src.path().join("absent.toml").to_str().unwrap(),
    ])
    .unwrap();

    assert!(folderize::run_app(cli).is_err());
}
