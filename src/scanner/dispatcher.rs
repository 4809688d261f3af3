//! Batch Dispatcher
//!
//! Drives a scan run: the file list is cut into batches, at most
//! `worker_concurrency` batches are in flight at once, and every finished
//! batch flows through a single aggregation step that updates the
//! [`ScanResult`], applies dispositions to infected files and reports
//! progress.
//!
//! ## Cancellation
//!
//! The [`CancellationFlag`] is checked before each batch assignment. Once it
//! is set no new batch starts and in-flight batches drain. An abort also
//! makes workers stop between files; the files already scanned are still
//! aggregated and reported.
//!
//! ## Failure
//!
//! Per-file scan errors are recorded and tolerated. A batch in which every
//! file failed because of the scanner itself, or a worker task that dies,
//! is a pool failure: assignment stops, in-flight work drains, and the
//! partial result is returned inside [`EngineError::PoolFailure`].

use crate::scanner::backend::{CommandBackend, ScanBackend};
use crate::scanner::cancel::CancellationFlag;
use crate::scanner::command::ScannerCommand;
use crate::scanner::disposition::InfectionHandler;
use crate::scanner::error::{EngineError, EngineResult};
use crate::scanner::types::{
    partition, DispositionOutcome, FileFailure, FileList, ScanBatch, ScanConfiguration, ScanFault,
    ScanResult, Verdict,
};
use log::Level;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Verdicts produced by one worker for one batch
#[derive(Debug)]
struct BatchReport {
    index: usize,
    verdicts: Vec<(PathBuf, Verdict)>,
}

/// Bounded worker pool over scan batches
pub struct BatchDispatcher {
    config: ScanConfiguration,
    backend: Arc<dyn ScanBackend>,
    handler: InfectionHandler,
}

impl BatchDispatcher {
    pub fn new(config: ScanConfiguration, backend: Arc<dyn ScanBackend>) -> Self {
        let handler = InfectionHandler::new(config.disposition().clone());
        Self {
            config,
            backend,
            handler,
        }
    }

    /// Dispatcher invoking `command` once per file
    pub fn with_command(config: ScanConfiguration, command: ScannerCommand) -> Self {
        let backend = CommandBackend::new(command, config.scan_timeout());
        Self::new(config, Arc::new(backend))
    }

    pub fn config(&self) -> &ScanConfiguration {
        &self.config
    }

    /// Scan `files`, calling `on_progress` once per completed batch with its file count
    pub async fn run<F>(
        &self,
        files: FileList,
        mut on_progress: F,
        cancel: &CancellationFlag,
    ) -> EngineResult<ScanResult>
    where
        F: FnMut(usize),
    {
        let started = Instant::now();
        let mut result = ScanResult::empty(files.len());
        if files.is_empty() {
            return Ok(result);
        }

        let batches = partition(&files, self.config.batch_size());
        let workers = self.config.worker_concurrency();
        self.journal(
            Level::Info,
            format_args!(
                "Scanning {} files in {} batches of up to {} with {} workers",
                files.len(),
                batches.len(),
                self.config.batch_size(),
                workers
            ),
        );

        let mut pending = batches.into_iter();
        let mut in_flight: JoinSet<BatchReport> = JoinSet::new();
        let mut failure: Option<String> = None;
        let mut stop_logged = false;

        loop {
            while failure.is_none() && in_flight.len() < workers {
                if cancel.is_cancelled() {
                    if !stop_logged && pending.len() > 0 {
                        self.journal(
                            Level::Info,
                            format_args!(
                                "Cancellation requested; {} batches not started, draining {} in flight",
                                pending.len(),
                                in_flight.len()
                            ),
                        );
                        stop_logged = true;
                    }
                    break;
                }
                let Some(batch) = pending.next() else {
                    break;
                };
                log::trace!("Assigning batch {} ({} files)", batch.index(), batch.len());
                in_flight.spawn(scan_batch(batch, Arc::clone(&self.backend), cancel.clone()));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            match joined {
                Ok(report) => {
                    if let Some(reason) = self.aggregate(report, &mut result, &mut on_progress).await
                    {
                        failure.get_or_insert(reason);
                    }
                }
                Err(e) => {
                    failure.get_or_insert(format!("Worker task failed: {}", e));
                }
            }
        }

        result.elapsed = started.elapsed();
        result.cancelled = cancel.is_cancelled() && result.total_files < result.enumerated;

        if let Some(reason) = failure {
            self.journal(
                Level::Error,
                format_args!(
                    "Scan aborted: {} ({} of {} files processed)",
                    reason, result.total_files, result.enumerated
                ),
            );
            return Err(EngineError::PoolFailure {
                reason,
                partial: Box::new(result),
            });
        }

        if !result.errors.is_empty() {
            self.journal(
                Level::Warn,
                format_args!("{} files could not be scanned", result.errors.len()),
            );
        }
        self.journal(
            Level::Info,
            format_args!(
                "Scan {}: {} files in {:.2}s, {} infected",
                if result.cancelled { "cancelled" } else { "complete" },
                result.total_files,
                result.elapsed.as_secs_f64(),
                result.infected.len()
            ),
        );
        Ok(result)
    }

    /// Single aggregation point; returns a pool failure reason if the batch shows a dead scanner
    async fn aggregate<F>(
        &self,
        report: BatchReport,
        result: &mut ScanResult,
        on_progress: &mut F,
    ) -> Option<String>
    where
        F: FnMut(usize),
    {
        let count = report.verdicts.len();
        let scanner_faults = report
            .verdicts
            .iter()
            .filter(|(_, verdict)| verdict.is_scanner_fault())
            .count();
        let mut first_fault: Option<String> = None;

        for (path, verdict) in report.verdicts {
            match verdict {
                Verdict::Clean => result.processed += 1,
                Verdict::Infected { details } => {
                    result.processed += 1;
                    self.journal(
                        Level::Warn,
                        format_args!("Infected file: {}: {}", path.display(), details),
                    );
                    let record = self.handler.dispose(&path, details).await;
                    match &record.disposition {
                        DispositionOutcome::Failed { action, reason } => {
                            self.journal(
                                Level::Warn,
                                format_args!(
                                    "Could not {} {}: {}",
                                    action,
                                    path.display(),
                                    reason
                                ),
                            )
                        }
                        outcome => self.journal(
                            Level::Info,
                            format_args!("{}: {:?}", path.display(), outcome),
                        ),
                    }
                    result.infected.push(record);
                }
                Verdict::ScanError { reason, fault } => {
                    log::debug!("Scan error on {}: {}", path.display(), reason);
                    if fault == ScanFault::Scanner && first_fault.is_none() {
                        first_fault = Some(reason.clone());
                    }
                    result.errors.push(FileFailure { path, reason, fault });
                }
            }
        }

        result.total_files += count;
        on_progress(count);

        if count > 0 && scanner_faults == count {
            Some(format!(
                "Scanner failed on every file of batch {}: {}",
                report.index,
                first_fault.unwrap_or_default()
            ))
        } else {
            None
        }
    }

    fn journal(&self, level: Level, message: std::fmt::Arguments<'_>) {
        if self.config.logging_enabled() {
            log::log!(level, "{}", message);
        }
    }
}

/// Worker body: scan each file of the batch in order
async fn scan_batch(
    batch: ScanBatch,
    backend: Arc<dyn ScanBackend>,
    cancel: CancellationFlag,
) -> BatchReport {
    let mut verdicts = Vec::with_capacity(batch.len());
    for path in batch.paths() {
        if cancel.is_aborted() {
            log::debug!(
                "Batch {} aborted after {} of {} files",
                batch.index(),
                verdicts.len(),
                batch.len()
            );
            break;
        }
        let verdict = backend.scan_file(path).await;
        verdicts.push((path.clone(), verdict));
    }
    BatchReport {
        index: batch.index(),
        verdicts,
    }
}

/// Run a full scan with the resolved scanner command
pub async fn run_scan<F>(
    files: FileList,
    config: ScanConfiguration,
    command: ScannerCommand,
    on_progress: F,
    cancel: &CancellationFlag,
) -> EngineResult<ScanResult>
where
    F: FnMut(usize),
{
    BatchDispatcher::with_command(config, command)
        .run(files, on_progress, cancel)
        .await
}
