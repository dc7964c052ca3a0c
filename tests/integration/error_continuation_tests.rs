use chrono::{Local, TimeZone};
use clap::Parser;
use filetime::FileTime;
use folderize::cli::Cli;
use folderize::config::{Config, Settings};
use folderize::error::ExitCode;
use folderize::progress::NullReporter;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn settings(src: &TempDir, dst: &TempDir, extra: &[&str]) -> Settings {
    let mut argv = vec![
        "folderize",
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ];
    argv.extend_from_slice(extra);
    let cli = Cli::try_parse_from(argv).unwrap();
    Config::default().resolve(&cli).unwrap()
}

fn write_dated(path: &Path, content: &[u8], year: i32, month: u32, day: u32) {
    fs::write(path, content).unwrap();
    let noon = Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(noon.timestamp(), 0)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_file_is_reported_and_others_copied() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("a.txt"), b"alpha", 2020, 3, 15);
    write_dated(&src.path().join("b.txt"), b"bravo", 2020, 3, 15);
    let locked = src.path().join("locked.txt");
    write_dated(&locked, b"secret", 2020, 3, 15);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root bypasses permission checks; nothing to observe then.
    if fs::read(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let summary = folderize::run(&settings(&src, &dst, &[]), &NullReporter, None).unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(summary.copy.copied, 2);
    assert_eq!(summary.copy.failed, 1);
    assert_eq!(summary.copy.errors[0].path, locked);
    assert_eq!(summary.exit_code(), ExitCode::PartialSuccess);
    assert!(dst.path().join("2020/March/15/a.txt").exists());
    assert!(dst.path().join("2020/March/15/b.txt").exists());
    assert!(!dst.path().join("2020/March/15/locked.txt").exists());
}

#[test]
fn test_blocked_date_folder_fails_only_its_files() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let blocked = src.path().join("old.txt");
    write_dated(&blocked, b"old", 2020, 3, 15);
    write_dated(&src.path().join("new.txt"), b"new", 2021, 7, 1);
    // A plain file where the year folder should go
    fs::write(dst.path().join("2020"), b"not a folder").unwrap();

    let summary = folderize::run(&settings(&src, &dst, &[]), &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 1);
    assert_eq!(summary.copy.failed, 1);
    assert_eq!(summary.copy.errors.len(), 1);
    assert_eq!(summary.copy.errors[0].path, blocked);
    assert_eq!(summary.exit_code(), ExitCode::PartialSuccess);
    assert!(dst.path().join("2021/July/1/new.txt").exists());
}

#[test]
fn test_failed_files_are_retried_on_next_run() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("old.txt"), b"old", 2020, 3, 15);
    let blocker = dst.path().join("2020");
    fs::write(&blocker, b"not a folder").unwrap();
    let settings = settings(&src, &dst, &["--cache"]);

    let first = folderize::run(&settings, &NullReporter, None).unwrap();
    assert_eq!(first.copy.failed, 1);

    fs::remove_file(&blocker).unwrap();
    let second = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(second.copy.copied, 1);
    assert_eq!(second.exit_code(), ExitCode::Success);
    assert_eq!(second.reconciled_removed, 1);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_are_copied_and_indexed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let name = OsStr::from_bytes(b"old\xff.jpg");
    write_dated(&src.path().join(name), b"jpeg bytes", 2020, 3, 15);
    fs::write(dst.path().join(name), b"already here").unwrap();
    fs::write(dst.path().join("z.txt"), b"zulu").unwrap();
    let settings = settings(&src, &dst, &["--cache"]);

    let first = folderize::run(&settings, &NullReporter, None).unwrap();
    assert_eq!(first.copy.copied, 1);
    assert_eq!(first.indexed_files, 3);
    assert_eq!(first.exit_code(), ExitCode::Success);
    assert!(dst.path().join("2020/March/15").join(name).exists());

    let second = folderize::run(&settings, &NullReporter, None).unwrap();
    assert_eq!(second.copy.copied, 0);
    assert_eq!(second.copy.skipped, 1);
    assert_eq!(second.reconciled_added, 0);
    assert_eq!(second.reconciled_removed, 0);
}
