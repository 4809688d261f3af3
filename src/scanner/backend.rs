//! Per-file scanner invocation
//!
//! [`ScanBackend`] is the seam between the dispatcher and whatever classifies
//! a file. [`CommandBackend`] runs the resolved ClamAV command once per file
//! and maps its exit status to a [`Verdict`]:
//!
//! | exit status | verdict |
//! |-------------|---------|
//! | 0 | `Clean` |
//! | 1 | `Infected`, stdout kept verbatim |
//! | 2 | `ScanError`; scanner fault if the daemon is unreachable, input fault otherwise |
//! | other / signal / launch failure | `ScanError`, scanner fault |
//! | timeout | `ScanError`, input fault |

use crate::scanner::command::ScannerCommand;
use crate::scanner::types::{ScanFault, Verdict};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static SIGNATURE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m): ([^:\r\n]+) FOUND\s*$").expect("signature pattern is valid")
});

static DAEMON_UNREACHABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(can't|could not|cannot|unable to) connect").expect("connect pattern is valid")
});

/// Classifies a single file
#[async_trait]
pub trait ScanBackend: Send + Sync {
    async fn scan_file(&self, path: &Path) -> Verdict;
}

/// Runs an external scanner command per file
#[derive(Debug, Clone)]
pub struct CommandBackend {
    command: ScannerCommand,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(command: ScannerCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn command(&self) -> &ScannerCommand {
        &self.command
    }
}

#[async_trait]
impl ScanBackend for CommandBackend {
    async fn scan_file(&self, path: &Path) -> Verdict {
        let child = match self.command.invocation(path).spawn() {
            Ok(child) => child,
            Err(e) => {
                return Verdict::scan_error(
                    format!("Failed to launch {}: {}", self.command.program().display(), e),
                    ScanFault::Scanner,
                )
            }
        };

        // Dropping the wait future on timeout kills the child
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => Verdict::scan_error(
                format!("Scan timed out after {:?}", self.timeout),
                ScanFault::Input,
            ),
            Ok(Err(e)) => Verdict::scan_error(
                format!("Failed waiting for scanner: {}", e),
                ScanFault::Scanner,
            ),
            Ok(Ok(output)) => classify_output(
                output.status.code(),
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
        }
    }
}

/// Map a scanner exit status and output to a verdict
pub fn classify_output(code: Option<i32>, stdout: &str, stderr: &str) -> Verdict {
    match code {
        Some(0) => Verdict::Clean,
        Some(1) => {
            let details = if stdout.trim().is_empty() { stderr } else { stdout };
            Verdict::Infected {
                details: details.trim_end().to_string(),
            }
        }
        Some(2) => {
            let message = first_message(stderr, stdout)
                .unwrap_or("scanner reported an error")
                .to_string();
            let fault = if DAEMON_UNREACHABLE.is_match(stderr) || DAEMON_UNREACHABLE.is_match(stdout)
            {
                ScanFault::Scanner
            } else {
                ScanFault::Input
            };
            Verdict::scan_error(message, fault)
        }
        Some(other) => Verdict::scan_error(
            format!("Unexpected scanner exit status {}", other),
            ScanFault::Scanner,
        ),
        None => Verdict::scan_error("Scanner terminated by signal", ScanFault::Scanner),
    }
}

/// Extract the signature name from a `path: Name FOUND` line
pub fn signature_name(output: &str) -> Option<String> {
    SIGNATURE_LINE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn first_message<'a>(primary: &'a str, secondary: &'a str) -> Option<&'a str> {
    [primary, secondary]
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .find(|line| !line.is_empty())
}
