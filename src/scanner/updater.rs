//! Signature database refresh
//!
//! Runs the external updater (`freshclam` unless configured otherwise) before
//! a scan. The outcome is advisory: stale signatures lower detection quality
//! but must never prevent a scan from running.

use crate::core::retry::{retry_async, RetryPolicy};
use std::process::Stdio;
use std::time::Duration;

pub const DEFAULT_UPDATER: &str = "freshclam";

/// Result of an update attempt; none of these stop the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// freshclam exits 1 when there was nothing to download
    UpToDate,
    Failed { reason: String },
}

impl UpdateOutcome {
    pub fn is_warning(&self) -> bool {
        matches!(self, UpdateOutcome::Failed { .. })
    }
}

impl std::fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOutcome::Updated => write!(f, "updated"),
            UpdateOutcome::UpToDate => write!(f, "up to date"),
            UpdateOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseUpdater {
    program: String,
    args: Vec<String>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Default for DatabaseUpdater {
    fn default() -> Self {
        Self {
            program: DEFAULT_UPDATER.to_string(),
            args: Vec::new(),
            retry: RetryPolicy::fixed(2, Duration::from_secs(2)),
            timeout: Duration::from_secs(600),
        }
    }
}

impl DatabaseUpdater {
    /// Build from a command line such as `freshclam --quiet`
    pub fn from_command_line(command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| DEFAULT_UPDATER.to_string());
        Self {
            program,
            args: parts.collect(),
            ..Self::default()
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn update(&self) -> UpdateOutcome {
        log::info!("Updating signature database with {}", self.program);
        match retry_async("signature database update", self.retry.clone(), || self.run_once()).await {
            Ok(outcome) => {
                match outcome {
                    UpdateOutcome::UpToDate => log::info!("Signature database is up to date"),
                    _ => log::info!("Signature database updated"),
                }
                outcome
            }
            Err(reason) => {
                log::warn!(
                    "Signature database update failed, scanning with existing signatures: {}",
                    reason
                );
                UpdateOutcome::Failed { reason }
            }
        }
    }

    async fn run_once(&self) -> Result<UpdateOutcome, String> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to launch {}: {}", self.program, e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("{} timed out after {:?}", self.program, self.timeout))?
            .map_err(|e| format!("Failed waiting for {}: {}", self.program, e))?;

        match output.status.code() {
            Some(0) => Ok(UpdateOutcome::Updated),
            Some(1) => Ok(UpdateOutcome::UpToDate),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.lines().map(str::trim).find(|l| !l.is_empty());
                Err(format!(
                    "{} exited with {}{}",
                    self.program,
                    code.map_or_else(|| "a signal".to_string(), |c| format!("status {}", c)),
                    detail.map(|d| format!(": {}", d)).unwrap_or_default()
                ))
            }
        }
    }
}
