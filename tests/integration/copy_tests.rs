use chrono::{Local, TimeZone};
use clap::Parser;
use filetime::FileTime;
use folderize::cli::Cli;
use folderize::config::{Config, Settings};
use folderize::progress::NullReporter;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn settings(args: &[&str]) -> Settings {
    let mut argv = vec!["folderize"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    Config::default().resolve(&cli).unwrap()
}

fn local_noon(year: i32, month: u32, day: u32) -> FileTime {
    let date = Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap();
    FileTime::from_unix_time(date.timestamp(), 0)
}

fn write_dated(path: &Path, content: &[u8], mtime: FileTime) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, mtime).unwrap();
}

#[test]
fn test_copies_first_of_identical_files_into_dated_folder() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("a.txt"), b"hello", local_noon(2020, 3, 15));
    write_dated(&src.path().join("sub/b.txt"), b"hello", local_noon(2021, 7, 1));

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ]);
    let summary = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 1);
    assert_eq!(summary.copy.skipped, 1);
    assert!(summary.copy.errors.is_empty());

    let copied = dst.path().join("2020/March/15/a.txt");
    assert_eq!(fs::read(&copied).unwrap(), b"hello");
    assert!(!dst.path().join("2021").exists());
    assert!(!dst.path().join(".folderize.cache").exists());
}

#[test]
fn test_copy_preserves_modification_time() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let mtime = local_noon(2019, 12, 24);
    write_dated(&src.path().join("photo.jpg"), b"jpeg bytes", mtime);

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
        "-d",
        "%Y/%m-%d",
    ]);
    folderize::run(&settings, &NullReporter, None).unwrap();

    let copied = dst.path().join("2019/12-24/photo.jpg");
    let metadata = fs::metadata(&copied).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&metadata), mtime);
}

#[test]
fn test_existing_content_anywhere_in_output_is_skipped() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("new-name.txt"), b"kept", local_noon(2022, 1, 2));
    fs::create_dir_all(dst.path().join("unsorted")).unwrap();
    fs::write(dst.path().join("unsorted/old-name.txt"), b"kept").unwrap();

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ]);
    let summary = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 0);
    assert_eq!(summary.copy.skipped, 1);
    assert!(!dst.path().join("2022").exists());
}

#[test]
fn test_name_collision_gets_numbered_suffix() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("a.txt"), b"new content", local_noon(2020, 3, 15));
    fs::create_dir_all(dst.path().join("2020/March/15")).unwrap();
    fs::write(dst.path().join("2020/March/15/a.txt"), b"old content").unwrap();

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ]);
    let summary = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 1);
    assert_eq!(
        fs::read(dst.path().join("2020/March/15/a.txt")).unwrap(),
        b"old content"
    );
    assert_eq!(
        fs::read(dst.path().join("2020/March/15/a (1).txt")).unwrap(),
        b"new content"
    );
}

#[test]
fn test_second_run_copies_nothing() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("one"), b"1", local_noon(2020, 1, 1));
    write_dated(&src.path().join("two"), b"2", local_noon(2020, 1, 2));

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ]);
    let first = folderize::run(&settings, &NullReporter, None).unwrap();
    let second = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(first.copy.copied, 2);
    assert_eq!(second.copy.copied, 0);
    assert_eq!(second.copy.skipped, 2);
}

#[test]
fn test_duplicates_across_inputs_are_copied_once() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&first.path().join("x.bin"), b"shared", local_noon(2020, 5, 5));
    write_dated(&second.path().join("y.bin"), b"shared", local_noon(2020, 6, 6));

    let settings = settings(&[
        "-i",
        first.path().to_str().unwrap(),
        second.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ]);
    let summary = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 1);
    assert_eq!(summary.copy.skipped, 1);
    assert!(dst.path().join("2020/May/5/x.bin").exists());
    assert!(!dst.path().join("2020/June").exists());
}

#[test]
fn test_exclude_patterns_skip_files_and_directories() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let mtime = local_noon(2020, 3, 15);
    write_dated(&src.path().join("keep.txt"), b"keep", mtime);
    write_dated(&src.path().join("scratch.tmp"), b"tmp", mtime);
    write_dated(&src.path().join("cache/inner.txt"), b"inner", mtime);

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
        "-e",
        "\\.tmp$",
        "-g",
        "cache",
    ]);
    let summary = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 1);
    assert_eq!(summary.copy.excluded_files, 1);
    assert_eq!(summary.copy.excluded_dirs, 1);
    assert!(dst.path().join("2020/March/15/keep.txt").exists());
    assert!(!dst.path().join("2020/March/15/scratch.tmp").exists());
    assert!(!dst.path().join("2020/March/15/inner.txt").exists());
}

#[test]
fn test_missing_output_is_created() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let output = dst.path().join("archive/photos");
    write_dated(&src.path().join("a"), b"a", local_noon(2020, 3, 15));

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);
    let summary = folderize::run(&settings, &NullReporter, None).unwrap();

    assert_eq!(summary.copy.copied, 1);
    assert!(output.join("2020/March/15/a").exists());
}

#[test]
fn test_localized_month_folder() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("a"), b"a", local_noon(2020, 3, 15));

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
        "-l",
        "de-DE",
    ]);
    folderize::run(&settings, &NullReporter, None).unwrap();

    assert!(dst.path().join("2020/März/15/a").exists());
}

#[test]
fn test_existing_folder_with_longer_name_is_reused() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("a"), b"a", local_noon(2020, 3, 15));
    fs::create_dir_all(dst.path().join("2020/March - Holiday")).unwrap();

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
    ]);
    folderize::run(&settings, &NullReporter, None).unwrap();

    assert!(dst.path().join("2020/March - Holiday/15/a").exists());
    assert!(!dst.path().join("2020/March").exists());
}

#[test]
fn test_interrupt_flag_stops_before_copying() {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_dated(&src.path().join("a"), b"a", local_noon(2020, 3, 15));

    let settings = settings(&[
        "-i",
        src.path().to_str().unwrap(),
        "-o",
        dst.path().to_str().unwrap(),
        "--cache",
    ]);
    let flag = Arc::new(AtomicBool::new(true));
    let summary = folderize::run(&settings, &NullReporter, Some(flag)).unwrap();

    assert!(summary.copy.interrupted);
    assert_eq!(summary.copy.copied, 0);
    assert_eq!(
        summary.exit_code(),
        folderize::error::ExitCode::Interrupted
    );
    assert!(dst.path().join(".folderize.cache").exists());
}
