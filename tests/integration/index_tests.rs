use folderize::index::ContentIndex;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_generate_indexes_one_path_per_content() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("one.txt"), b"1").unwrap();
    fs::write(dir.path().join("a/b/one-again.txt"), b"1").unwrap();
    fs::write(dir.path().join("a/two.txt"), b"2").unwrap();

    let mut index = ContentIndex::new(dir.path()).unwrap();
    let inserted = index.generate().unwrap();

    assert_eq!(inserted, 2);
    assert_eq!(index.len(), 2);
    assert_eq!(index.hash_count(), 2);
    for (_, relative) in index.iter() {
        assert!(!relative.contains(&b'\\'));
    }
}

#[test]
fn test_update_adds_and_removes() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
    fs::write(dir.path().join("gone.txt"), b"gone").unwrap();

    let mut index = ContentIndex::new(dir.path()).unwrap();
    index.generate().unwrap();

    fs::remove_file(dir.path().join("gone.txt")).unwrap();
    fs::create_dir(dir.path().join("new")).unwrap();
    fs::write(dir.path().join("new/fresh.txt"), b"fresh").unwrap();

    let diff = index.update().unwrap();

    assert_eq!(diff.removed, vec![PathBuf::from("gone.txt")]);
    assert_eq!(diff.added, vec![index.root().join("new/fresh.txt")]);
    assert_eq!(diff.total(), 2);
    assert_eq!(index.len(), 2);

    let again = index.update().unwrap();
    assert!(again.is_empty());
}

#[test]
fn test_cache_round_trip_preserves_entries() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("2020/March/15")).unwrap();
    fs::write(dir.path().join("2020/March/15/y z.txt"), b"spaces").unwrap();
    fs::write(dir.path().join("odd#name;with:delims"), b"delims").unwrap();

    let mut index = ContentIndex::new(dir.path()).unwrap();
    index.generate().unwrap();
    index.save_cachefile().unwrap();

    let mut restored = ContentIndex::new(dir.path()).unwrap();
    restored.load_cachefile().unwrap();

    let original: Vec<_> = index.iter().collect();
    let loaded: Vec<_> = restored.iter().collect();
    assert_eq!(original, loaded);
}

#[test]
fn test_contains_detects_content_not_names() {
    let dst = TempDir::new().unwrap();
    let src = TempDir::new().unwrap();
    fs::write(dst.path().join("stored.bin"), b"payload").unwrap();
    fs::write(src.path().join("stored.bin"), b"different").unwrap();
    fs::write(src.path().join("renamed.bin"), b"payload").unwrap();

    let mut index = ContentIndex::new(dst.path()).unwrap();
    index.generate().unwrap();

    assert!(index.contains(&src.path().join("renamed.bin")).unwrap());
    assert!(!index.contains(&src.path().join("stored.bin")).unwrap());
}
