//! On-disk fixture trees

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Marker the fake scanner treats as a detection
pub const INFECTED_MARKER: &str = "X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-TEST";

/// Create `relative` under `root` with `contents`, including parent directories
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// A temporary tree of clean files
pub fn clean_tree(relatives: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for relative in relatives {
        write_file(dir.path(), relative, "nothing to see here\n");
    }
    dir
}

/// Plant an infected file in an existing tree
pub fn plant_infection(root: &Path, relative: &str) -> PathBuf {
    write_file(root, relative, INFECTED_MARKER)
}

/// Paths relative to `root`, sorted
pub fn relative_paths<'a>(root: &Path, paths: impl IntoIterator<Item = &'a PathBuf>) -> Vec<String> {
    let mut out: Vec<String> = paths
        .into_iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    out.sort();
    out
}
