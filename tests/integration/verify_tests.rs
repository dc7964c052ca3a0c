use clap::Parser;
use folderize::cli::Cli;
use folderize::config::{Config, Settings};
use folderize::error::ExitCode;
use folderize::progress::NullReporter;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn verify_settings(src: &Path, dst: &Path, extra: &[&str]) -> Settings {
    let mut argv = vec![
        "folderize",
        "-i",
        src.to_str().unwrap(),
        "-o",
        dst.to_str().unwrap(),
        "--verify",
    ];
    argv.extend_from_slice(extra);
    let cli = Cli::try_parse_from(argv).unwrap();
    Config::default().resolve(&cli).unwrap()
}

#[test]
fn test_verify_reports_missing_and_copies_nothing() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("present.txt"), b"present").unwrap();
    fs::write(src.path().join("absent.txt"), b"absent").unwrap();
    fs::create_dir(dst.path().join("2020")).unwrap();
    fs::write(dst.path().join("2020/present.txt"), b"present").unwrap();

    let summary = folderize::run(
        &verify_settings(src.path(), dst.path(), &["--cache"]),
        &NullReporter,
        None,
    )
    .unwrap();

    let report = summary.verify.as_ref().unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.missing, vec![src.path().join("absent.txt")]);
    assert_eq!(summary.exit_code(), ExitCode::MissingFiles);
    assert_eq!(summary.copy.copied, 0);

    let entries: Vec<_> = fs::read_dir(dst.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert!(!dst.path().join(".folderize.cache").exists());
}

#[test]
fn test_verify_complete_is_success() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("a"), b"a").unwrap();
    fs::write(dst.path().join("b"), b"a").unwrap();

    let summary =
        folderize::run(&verify_settings(src.path(), dst.path(), &[]), &NullReporter, None)
            .unwrap();

    assert!(summary.verify.as_ref().unwrap().is_complete());
    assert_eq!(summary.exit_code(), ExitCode::Success);
}

#[test]
fn test_verify_missing_output_is_not_created() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let output = dst.path().join("not-yet");
    fs::write(src.path().join("a"), b"a").unwrap();

    let summary =
        folderize::run(&verify_settings(src.path(), &output, &[]), &NullReporter, None).unwrap();

    assert_eq!(summary.verify.as_ref().unwrap().missing.len(), 1);
    assert!(!output.exists());
}

#[test]
fn test_verify_honours_exclude_patterns() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::write(src.path().join("Thumbs.db"), b"thumbs").unwrap();

    let summary = folderize::run(
        &verify_settings(src.path(), dst.path(), &["-g", "Thumbs.db"]),
        &NullReporter,
        None,
    )
    .unwrap();

    let report = summary.verify.as_ref().unwrap();
    assert_eq!(report.checked, 0);
    assert!(report.missing.is_empty());
}

#[test]
fn test_verify_after_copy_is_complete() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    fs::create_dir(src.path().join("nested")).unwrap();
    fs::write(src.path().join("nested/one"), b"1").unwrap();
    fs::write(src.path().join("two"), b"2").unwrap();

    let cli = Cli::try_parse_from([
        "folderize",
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ])
    .unwrap();
    let copy_settings = Config::default().resolve(&cli).unwrap();
    folderize::run(&copy_settings, &NullReporter, None).unwrap();

    let summary =
        folderize::run(&verify_settings(src.path(), dst.path(), &[]), &NullReporter, None)
            .unwrap();

    assert!(summary.verify.as_ref().unwrap().is_complete());
}
