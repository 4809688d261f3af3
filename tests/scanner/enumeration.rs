//! File enumeration over real directory trees

use crate::common::fixtures::{clean_tree, relative_paths, write_file};
use clamsweep::scanner::api::{enumerate, FileEnumerator, FileFilter};
use std::path::PathBuf;

#[test]
fn test_enumerates_nested_regular_files() {
    let tree = clean_tree(&["a.txt", "docs/b.pdf", "docs/deep/c.bin"]);
    let result = enumerate(&[tree.path().to_path_buf()], &[]);

    assert_eq!(
        relative_paths(tree.path(), result.files.iter()),
        vec!["a.txt", "docs/b.pdf", "docs/deep/c.bin"]
    );
    assert!(result.warnings.is_empty());
}

#[test]
fn test_excluded_subtree_is_pruned() {
    let tree = clean_tree(&["keep/one", "skip/two", "skip/nested/three"]);
    let result = enumerate(&[tree.path().to_path_buf()], &[tree.path().join("skip")]);

    assert_eq!(relative_paths(tree.path(), result.files.iter()), vec!["keep/one"]);
}

#[test]
fn test_overlapping_roots_yield_each_file_once() {
    let tree = clean_tree(&["top", "sub/inner"]);
    let roots = vec![tree.path().to_path_buf(), tree.path().join("sub")];
    let result = enumerate(&roots, &[]);

    assert_eq!(relative_paths(tree.path(), result.files.iter()), vec!["sub/inner", "top"]);
}

#[test]
fn test_missing_root_is_a_warning_not_an_error() {
    let tree = clean_tree(&["present"]);
    let roots = vec![tree.path().join("absent"), tree.path().to_path_buf()];
    let result = enumerate(&roots, &[]);

    assert_eq!(result.files.len(), 1);
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_file_patterns_filter_by_name() {
    let tree = clean_tree(&["movie.iso", "notes.txt", "disk/backup.iso"]);
    let filter = FileFilter::from_patterns(&["*.iso"]).unwrap();
    let result = FileEnumerator::new(Vec::<PathBuf>::new())
        .with_filter(filter)
        .enumerate(&[tree.path().to_path_buf()]);

    assert_eq!(relative_paths(tree.path(), result.files.iter()), vec!["notes.txt"]);
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_terminates() {
    let tree = clean_tree(&["loop/file"]);
    std::os::unix::fs::symlink(tree.path(), tree.path().join("loop/back")).unwrap();
    write_file(tree.path(), "other", "x");

    let result = enumerate(&[tree.path().to_path_buf()], &[]);
    assert_eq!(relative_paths(tree.path(), result.files.iter()), vec!["loop/file", "other"]);
}
