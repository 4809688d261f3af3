//! Scanner command resolution
//!
//! Finds which ClamAV front end can be used on this host. The daemon client
//! (`clamdscan`) is preferred when a `clamd` process is running because it
//! reuses the loaded signature database; otherwise the standalone scanner
//! (`clamscan`) is used.

use crate::scanner::error::{EngineError, EngineResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

pub const DAEMON_CLIENT: &str = "clamdscan";
pub const STANDALONE_SCANNER: &str = "clamscan";
const DAEMON_PROCESS: &str = "clamd";

/// How the resolved scanner talks to the signature engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerMode {
    Daemon,
    Standalone,
}

impl std::fmt::Display for ScannerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerMode::Daemon => write!(f, "daemon"),
            ScannerMode::Standalone => write!(f, "standalone"),
        }
    }
}

/// Operator preference for scanner mode selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModePreference {
    #[default]
    Auto,
    Daemon,
    Standalone,
}

impl FromStr for ModePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ModePreference::Auto),
            "daemon" | "clamdscan" => Ok(ModePreference::Daemon),
            "standalone" | "clamscan" => Ok(ModePreference::Standalone),
            other => Err(format!(
                "Unknown scanner mode '{}' (expected auto, daemon or standalone)",
                other
            )),
        }
    }
}

/// Executable plus fixed argument template; the file path is appended last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerCommand {
    mode: ScannerMode,
    program: PathBuf,
    args: Vec<String>,
}

impl ScannerCommand {
    pub fn new(mode: ScannerMode, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            mode,
            program: program.into(),
            args,
        }
    }

    /// `clamdscan` passing the open descriptor so clamd can read files it has no permission for
    pub fn daemon(program: impl Into<PathBuf>) -> Self {
        Self::new(
            ScannerMode::Daemon,
            program,
            vec!["--no-summary".to_string(), "--fdpass".to_string()],
        )
    }

    pub fn standalone(program: impl Into<PathBuf>) -> Self {
        Self::new(
            ScannerMode::Standalone,
            program,
            vec!["--no-summary".to_string()],
        )
    }

    pub fn mode(&self) -> ScannerMode {
        self.mode
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build the process invocation for one file
    ///
    /// The child is killed if the returned command's future is dropped, so a
    /// timed-out or torn-down scan never leaves a scanner running.
    pub fn invocation(&self, file: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Outcome of probing the host for a scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Available(ScannerCommand),
    Unavailable { reason: String },
}

impl Resolution {
    /// Convert to a command, turning unavailability into a configuration error
    pub fn into_command(self) -> EngineResult<ScannerCommand> {
        match self {
            Resolution::Available(command) => Ok(command),
            Resolution::Unavailable { reason } => Err(EngineError::Configuration {
                message: format!("No usable scanner found: {}. Please install ClamAV.", reason),
            }),
        }
    }
}

/// Probes PATH and the process list for a ClamAV front end
pub struct ScannerCommandResolver {
    search_path: Option<OsString>,
    preference: ModePreference,
    daemon_probe: fn() -> bool,
}

impl Default for ScannerCommandResolver {
    fn default() -> Self {
        Self {
            search_path: None,
            preference: ModePreference::Auto,
            daemon_probe: clamd_running,
        }
    }
}

impl ScannerCommandResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search these directories instead of `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn with_preference(mut self, preference: ModePreference) -> Self {
        self.preference = preference;
        self
    }

    /// Replace the process-list probe used to detect a running daemon
    pub fn with_daemon_probe(mut self, probe: fn() -> bool) -> Self {
        self.daemon_probe = probe;
        self
    }

    pub fn resolve(&self) -> Resolution {
        let command = match self.preference {
            ModePreference::Auto => self.daemon_command().or_else(|| self.standalone_command()),
            ModePreference::Daemon => self.daemon_command(),
            ModePreference::Standalone => self.standalone_command(),
        };

        match command {
            Some(command) => {
                log::debug!(
                    "Resolved scanner {} ({:?} mode)",
                    command.program().display(),
                    command.mode()
                );
                Resolution::Available(command)
            }
            None => Resolution::Unavailable {
                reason: self.unavailable_reason(),
            },
        }
    }

    fn daemon_command(&self) -> Option<ScannerCommand> {
        let program = self.find(DAEMON_CLIENT)?;
        if (self.daemon_probe)() {
            Some(ScannerCommand::daemon(program))
        } else {
            log::debug!(
                "{} found at {} but no {} process is running",
                DAEMON_CLIENT,
                program.display(),
                DAEMON_PROCESS
            );
            None
        }
    }

    fn standalone_command(&self) -> Option<ScannerCommand> {
        self.find(STANDALONE_SCANNER).map(ScannerCommand::standalone)
    }

    fn find(&self, program: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                which::which_in(program, Some(paths), cwd).ok()
            }
            None => which::which(program).ok(),
        }
    }

    fn unavailable_reason(&self) -> String {
        match self.preference {
            ModePreference::Auto => format!(
                "neither {} (with a running {}) nor {} is available",
                DAEMON_CLIENT, DAEMON_PROCESS, STANDALONE_SCANNER
            ),
            ModePreference::Daemon => format!(
                "{} requires a running {} daemon and the client on PATH",
                DAEMON_CLIENT, DAEMON_PROCESS
            ),
            ModePreference::Standalone => format!("{} was not found on PATH", STANDALONE_SCANNER),
        }
    }
}

/// Check the process list for a running clamd
#[cfg(target_os = "linux")]
pub fn clamd_running() -> bool {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return false;
    };
    entries.flatten().any(|entry| {
        let is_pid = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()));
        is_pid
            && std::fs::read_to_string(entry.path().join("comm"))
                .is_ok_and(|comm| comm.trim() == DAEMON_PROCESS)
    })
}

#[cfg(not(target_os = "linux"))]
pub fn clamd_running() -> bool {
    // Fall back to the conventional control socket locations
    ["/var/run/clamav/clamd.ctl", "/run/clamav/clamd.ctl", "/tmp/clamd.socket"]
        .iter()
        .any(|p| Path::new(p).exists())
}
