use gcs_upload::path_utils::{compute_destination_key, enumerate_files, key_source_path, normalize_folder};
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn normalize_folder_strips_separators_and_is_idempotent() {
    let cases = [
        ("/builds/", "builds"),
        ("builds/", "builds"),
        ("/builds", "builds"),
        ("builds", "builds"),
        ("/a/b/c/", "a/b/c"),
        ("/", ""),
        ("", ""),
        ("//double//", "double"),
    ];

    for (input, expected) in cases {
        let once = normalize_folder(input);
        assert_eq!(once, expected, "normalize_folder({input:?})");
        assert_eq!(normalize_folder(&once), once, "not idempotent for {input:?}");
        assert!(!once.starts_with('/') && !once.ends_with('/'), "separator left in {once:?}");
    }
}

#[test]
fn destination_key_strips_matching_prefix() {
    assert_eq!(
        compute_destination_key(Path::new("/a/b/c.txt"), "/a/", "target"),
        "target/b/c.txt"
    );
}

#[test]
fn destination_key_with_empty_prefix_uses_full_path() {
    assert_eq!(
        compute_destination_key(Path::new("x/y.txt"), "", "target"),
        "target/x/y.txt"
    );
}

#[test]
fn destination_key_ignores_non_matching_prefix() {
    assert_eq!(
        compute_destination_key(Path::new("dist/app.js"), "build/", "out"),
        "out/dist/app.js"
    );
}

#[test]
fn destination_key_never_starts_with_separator() {
    let cases = [
        (Path::new("/abs/file.txt"), "", ""),
        (Path::new("/abs/file.txt"), "/abs", ""),
        (Path::new("rel/file.txt"), "rel", ""),
        (Path::new("./dist/file.txt"), "", "/out"),
    ];
    for (path, prefix, target) in cases {
        let key = compute_destination_key(path, prefix, target);
        assert!(!key.starts_with('/'), "key {key:?} for {path:?}");
    }
    assert_eq!(compute_destination_key(Path::new("./dist/file.txt"), "", "/out"), "out/dist/file.txt");
}

#[test]
fn matching_prefix_keys_from_walked_path_even_when_longer() {
    let root = Path::new("/w/dist");
    let file = Path::new("/w/dist/a.txt");

    let with_prefix = key_source_path(file, root, "/w/");
    assert_eq!(compute_destination_key(&with_prefix, "/w/", "out"), "out/dist/a.txt");

    let without_prefix = key_source_path(file, root, "");
    assert_eq!(compute_destination_key(&without_prefix, "", "out"), "out/a.txt");
}

#[test]
fn key_source_prefers_walked_path_when_prefix_matches() {
    let root = Path::new("dist");
    let file = Path::new("dist/sub/a.txt");

    assert_eq!(key_source_path(file, root, ""), PathBuf::from("sub/a.txt"));
    assert_eq!(key_source_path(file, root, "dist/sub/"), PathBuf::from("dist/sub/a.txt"));
    assert_eq!(key_source_path(file, root, "other/"), PathBuf::from("sub/a.txt"));
}

#[test]
fn enumeration_skips_directories_and_placeholders_in_nested_tree() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    create_dir_all(root.join("a/b/c")).unwrap();
    create_dir_all(root.join("empty")).unwrap();
    write(root.join(".gitkeep"), b"").unwrap();
    write(root.join("empty/.gitkeep"), b"").unwrap();
    write(root.join("a/b/c/.gitkeep"), b"").unwrap();
    write(root.join("top.txt"), b"top").unwrap();
    write(root.join("a/b/mid.json"), b"{}").unwrap();
    write(root.join("a/b/c/deep.png"), b"png").unwrap();

    let found: Vec<PathBuf> = enumerate_files(root).map(|r| r.unwrap()).collect();

    assert_eq!(
        found,
        vec![
            root.join("a/b/c/deep.png"),
            root.join("a/b/mid.json"),
            root.join("top.txt"),
        ]
    );
    assert!(found.iter().all(|p| p.is_file()));
    assert!(found.iter().all(|p| p.file_name().unwrap() != ".gitkeep"));
}

#[cfg(unix)]
#[test]
fn enumeration_lists_symlinked_files_but_not_symlinked_directories() {
    use std::os::unix::fs::symlink;

    let outside = tempdir().unwrap();
    write(outside.path().join("real.txt"), b"real").unwrap();
    create_dir_all(outside.path().join("shared")).unwrap();
    write(outside.path().join("shared/inner.txt"), b"inner").unwrap();

    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write(root.join("a.txt"), b"a").unwrap();
    symlink(outside.path().join("real.txt"), root.join("linked.txt")).unwrap();
    symlink(outside.path().join("shared"), root.join("shared")).unwrap();
    symlink(outside.path().join("gone.txt"), root.join("dangling.txt")).unwrap();

    let found: Vec<PathBuf> = enumerate_files(root).map(|r| r.unwrap()).collect();

    assert_eq!(found, vec![root.join("a.txt"), root.join("linked.txt")]);
}

#[test]
fn enumeration_is_a_fresh_sequence_per_call() {
    let tmp = tempdir().unwrap();
    write(tmp.path().join("one.txt"), b"1").unwrap();

    assert_eq!(enumerate_files(tmp.path()).count(), 1);
    write(tmp.path().join("two.txt"), b"2").unwrap();
    assert_eq!(enumerate_files(tmp.path()).count(), 2);
}

#[test]
fn enumeration_of_missing_root_yields_error() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("does-not-exist");

    let results: Vec<_> = enumerate_files(&missing).collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}
