//! Scanner Types
//!
//! Shared data model for the scan engine: configuration, the enumerated file
//! list and its batches, per-file verdicts and the aggregated run result.

use crate::core::validation::validate_glob_pattern;
use crate::scanner::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(300);

/// What happens to a file once the scanner flags it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Move the file into this directory
    Quarantine(PathBuf),
    /// Remove the file
    Delete,
}

/// Immutable settings for one scan run
///
/// Built through [`ScanConfiguration::builder`], which enforces that batch
/// size and worker concurrency are at least one.
#[derive(Debug, Clone)]
pub struct ScanConfiguration {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    exclude_files: Vec<String>,
    batch_size: usize,
    worker_concurrency: usize,
    disposition: Disposition,
    logging_enabled: bool,
    scan_timeout: Duration,
}

impl ScanConfiguration {
    pub fn builder() -> ScanConfigurationBuilder {
        ScanConfigurationBuilder::new()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn excluded(&self) -> &[PathBuf] {
        &self.excluded
    }

    /// Glob patterns matched against file names
    pub fn exclude_files(&self) -> &[String] {
        &self.exclude_files
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn worker_concurrency(&self) -> usize {
        self.worker_concurrency
    }

    pub fn disposition(&self) -> &Disposition {
        &self.disposition
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }

    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }
}

/// Builder for ScanConfiguration
#[derive(Debug)]
pub struct ScanConfigurationBuilder {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    exclude_files: Vec<String>,
    batch_size: usize,
    worker_concurrency: Option<usize>,
    disposition: Option<Disposition>,
    logging_enabled: bool,
    scan_timeout: Duration,
}

impl Default for ScanConfigurationBuilder {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            excluded: Vec::new(),
            exclude_files: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            worker_concurrency: None,
            disposition: None,
            logging_enabled: true,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl ScanConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.excluded.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn exclude_files<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_files
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn worker_concurrency(mut self, workers: usize) -> Self {
        self.worker_concurrency = Some(workers);
        self
    }

    pub fn disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    pub fn logging_enabled(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Validate and build the configuration
    ///
    /// Concurrency defaults to the number of logical CPUs. A disposition has
    /// no default and must be supplied.
    pub fn build(self) -> EngineResult<ScanConfiguration> {
        if self.batch_size == 0 {
            return Err(EngineError::configuration("Batch size must be at least 1"));
        }

        let worker_concurrency = self.worker_concurrency.unwrap_or_else(num_cpus::get);
        if worker_concurrency == 0 {
            return Err(EngineError::configuration(
                "Worker concurrency must be at least 1",
            ));
        }

        if self.scan_timeout.is_zero() {
            return Err(EngineError::configuration(
                "Per-file scan timeout must be greater than zero",
            ));
        }

        let disposition = self.disposition.ok_or_else(|| {
            EngineError::configuration("A quarantine directory or delete disposition is required")
        })?;

        for pattern in &self.exclude_files {
            validate_glob_pattern(pattern).map_err(EngineError::configuration)?;
        }

        Ok(ScanConfiguration {
            roots: self.roots,
            excluded: self.excluded,
            exclude_files: self.exclude_files,
            batch_size: self.batch_size,
            worker_concurrency,
            disposition,
            logging_enabled: self.logging_enabled,
            scan_timeout: self.scan_timeout,
        })
    }
}

/// Ordered, deduplicated list of files to scan
///
/// Cheap to clone; the underlying paths are shared and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList(Arc<[PathBuf]>);

impl FileList {
    /// Build a list keeping the first occurrence of each path
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let mut seen = HashSet::with_capacity(paths.len());
        let unique: Vec<PathBuf> = paths
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Self(unique.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.iter().any(|p| p == path)
    }
}

impl From<Vec<PathBuf>> for FileList {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self::new(paths)
    }
}

/// A contiguous slice of the file list handed to one worker
#[derive(Debug, Clone)]
pub struct ScanBatch {
    index: usize,
    files: FileList,
    range: Range<usize>,
}

impl ScanBatch {
    /// Position of this batch in enumeration order
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files.as_slice()[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Split the file list into consecutive batches of at most `batch_size` files
pub fn partition(files: &FileList, batch_size: usize) -> Vec<ScanBatch> {
    let batch_size = batch_size.max(1);
    (0..files.len())
        .step_by(batch_size)
        .enumerate()
        .map(|(index, start)| ScanBatch {
            index,
            files: files.clone(),
            range: start..(start + batch_size).min(files.len()),
        })
        .collect()
}

/// Which side failed when a file could not be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFault {
    /// The file itself: unreadable, vanished, too slow to scan
    Input,
    /// The scanner: failed to launch, crashed, cannot reach its daemon
    Scanner,
}

/// Classification of one scanned file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Infected { details: String },
    ScanError { reason: String, fault: ScanFault },
}

impl Verdict {
    pub fn scan_error(reason: impl Into<String>, fault: ScanFault) -> Self {
        Verdict::ScanError {
            reason: reason.into(),
            fault,
        }
    }

    pub fn is_scanner_fault(&self) -> bool {
        matches!(
            self,
            Verdict::ScanError {
                fault: ScanFault::Scanner,
                ..
            }
        )
    }
}

/// Result of applying the configured disposition to an infected file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispositionOutcome {
    Quarantined { destination: PathBuf },
    Deleted,
    /// The action failed; the file is still reported as infected
    Failed { action: String, reason: String },
}

impl DispositionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DispositionOutcome::Failed { .. })
    }
}

/// An infected file and what was done about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfectedRecord {
    pub path: PathBuf,
    /// Scanner output, verbatim
    pub output: String,
    pub signature: Option<String>,
    pub disposition: DispositionOutcome,
}

/// A file the scanner could not classify
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
    pub fault: ScanFault,
}

/// Aggregate outcome of a scan run
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub started_at: DateTime<Utc>,
    /// Files produced by enumeration
    pub enumerated: usize,
    /// Files whose batch completed; less than `enumerated` after cancellation
    pub total_files: usize,
    /// Files that received a Clean or Infected verdict
    pub processed: usize,
    pub infected: Vec<InfectedRecord>,
    pub errors: Vec<FileFailure>,
    #[serde(serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl ScanResult {
    pub fn empty(enumerated: usize) -> Self {
        Self {
            started_at: Utc::now(),
            enumerated,
            total_files: 0,
            processed: 0,
            infected: Vec::new(),
            errors: Vec::new(),
            elapsed: Duration::ZERO,
            cancelled: false,
        }
    }

    pub fn clean_files(&self) -> usize {
        self.processed.saturating_sub(self.infected.len())
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_files as f64 / secs
        } else {
            0.0
        }
    }

    pub fn has_infections(&self) -> bool {
        !self.infected.is_empty()
    }
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
