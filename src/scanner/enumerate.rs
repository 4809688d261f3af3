//! File enumeration
//!
//! Walks the scan roots and produces the flat, deterministic list of regular
//! files to scan. Excluded subtrees are pruned without being descended into,
//! and each directory is entered at most once (by canonical path), so
//! symlink cycles and overlapping roots terminate.

use crate::scanner::types::FileList;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A subtree or entry that could not be read; traversal continued without it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationWarning {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Enumerated files plus soft failures met on the way
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub files: FileList,
    pub warnings: Vec<EnumerationWarning>,
}

/// Name-based file predicate built from glob patterns
///
/// Patterns without a path separator match the file name; patterns with one
/// match the full path.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    patterns: Vec<glob::Pattern>,
}

impl FileFilter {
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, glob::PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if the file should be skipped
    pub fn excludes(&self, path: &Path) -> bool {
        self.patterns.iter().any(|pattern| {
            if pattern.as_str().contains('/') {
                pattern.matches_path(path)
            } else {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| pattern.matches(name))
            }
        })
    }
}

/// Recursive walker over a set of roots
#[derive(Debug, Clone, Default)]
pub struct FileEnumerator {
    excluded: Vec<PathBuf>,
    filter: FileFilter,
}

impl FileEnumerator {
    pub fn new<I, P>(excluded: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut prefixes = Vec::new();
        for path in excluded.into_iter().map(Into::into) {
            // Match both the path as written and where it really lives
            if let Ok(canonical) = path.canonicalize() {
                if canonical != path {
                    prefixes.push(canonical);
                }
            }
            prefixes.push(path);
        }
        Self {
            excluded: prefixes,
            filter: FileFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    /// True if `path` equals or lies below an excluded path
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|prefix| path.starts_with(prefix))
    }

    pub fn enumerate(&self, roots: &[PathBuf]) -> Enumeration {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut listed: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for root in roots {
            let root = match std::path::absolute(root) {
                Ok(root) => root,
                Err(e) => {
                    warnings.push(EnumerationWarning {
                        path: Some(root.clone()),
                        message: format!("Cannot resolve root: {}", e),
                    });
                    continue;
                }
            };

            let walker = WalkDir::new(&root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| self.should_enter(entry, &mut visited));

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && !self.filter.excludes(entry.path()) {
                            if let Some(path) = self.admit_file(entry, &mut listed, &mut warnings)
                            {
                                files.push(path);
                            }
                        }
                    }
                    Err(e) => {
                        let warning = EnumerationWarning {
                            path: e.path().map(Path::to_path_buf),
                            message: e.to_string(),
                        };
                        log::warn!("Skipping unreadable entry: {}", warning.message);
                        warnings.push(warning);
                    }
                }
            }
        }

        log::debug!(
            "Enumerated {} files from {} roots ({} warnings)",
            files.len(),
            roots.len(),
            warnings.len()
        );

        Enumeration {
            files: FileList::new(files),
            warnings,
        }
    }

    /// Path to list for a regular file, or `None` if it is excluded or already listed
    ///
    /// A file symlink is listed as its target, so disposition acts on the
    /// real file and a file seen through several names is scanned once.
    fn admit_file(
        &self,
        entry: DirEntry,
        listed: &mut HashSet<PathBuf>,
        warnings: &mut Vec<EnumerationWarning>,
    ) -> Option<PathBuf> {
        let canonical = match entry.path().canonicalize() {
            Ok(canonical) => canonical,
            Err(e) if entry.path_is_symlink() => {
                let warning = EnumerationWarning {
                    path: Some(entry.path().to_path_buf()),
                    message: format!("Cannot resolve link target: {}", e),
                };
                log::warn!("Skipping {}: {}", entry.path().display(), warning.message);
                warnings.push(warning);
                return None;
            }
            Err(_) => entry.path().to_path_buf(),
        };

        if !listed.insert(canonical.clone()) {
            log::debug!("Already listed: {}", entry.path().display());
            return None;
        }
        if !entry.path_is_symlink() {
            return Some(entry.into_path());
        }

        if self.is_excluded(&canonical) || self.filter.excludes(&canonical) {
            log::debug!(
                "Excluded via link: {} -> {}",
                entry.path().display(),
                canonical.display()
            );
            return None;
        }
        log::debug!("Listing link {} as {}", entry.path().display(), canonical.display());
        Some(canonical)
    }

    fn should_enter(&self, entry: &DirEntry, visited: &mut HashSet<PathBuf>) -> bool {
        let path = entry.path();
        if self.is_excluded(path) {
            log::debug!("Excluded: {}", path.display());
            return false;
        }
        if !entry.file_type().is_dir() {
            return true;
        }

        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.is_excluded(&canonical) {
            log::debug!("Excluded via link: {} -> {}", path.display(), canonical.display());
            return false;
        }
        if !visited.insert(canonical) {
            log::debug!("Already visited: {}", path.display());
            return false;
        }
        true
    }
}

/// Enumerate `roots`, pruning `excluded` subtrees
pub fn enumerate(roots: &[PathBuf], excluded: &[PathBuf]) -> Enumeration {
    FileEnumerator::new(excluded.iter().cloned()).enumerate(roots)
}
