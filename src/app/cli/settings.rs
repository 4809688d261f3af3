//! Resolution of parsed arguments into concrete run settings
//!
//! Defaults that depend on the host (CPU count, the invoking user's home)
//! are filled here.

use crate::app::report::OutputFormat;
use crate::core::logging::LogFormat;
use crate::core::validation::ValidationError;
use crate::scanner::command::ModePreference;
use crate::scanner::error::EngineResult;
use crate::scanner::types::{
    Disposition, ScanConfiguration, DEFAULT_BATCH_SIZE, DEFAULT_SCAN_TIMEOUT,
};
use crate::scanner::updater::DEFAULT_UPDATER;
use std::path::PathBuf;
use std::time::Duration;

use super::args::Args;

/// Pseudo-filesystems and volatile state that are never worth scanning
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "/proc", "/sys", "/dev", "/run", "/tmp", "/var/lib", "/var/run",
];

/// Per-user directory holding the quarantine and the scan log
pub const APP_DIR_NAME: &str = "clamsweep";
pub const QUARANTINE_DIR_NAME: &str = "quarantine";
pub const LOG_FILE_NAME: &str = "clamsweep.log";

/// Everything a run needs, with defaults applied
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub roots: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
    pub exclude_files: Vec<String>,
    pub batch_size: usize,
    pub jobs: usize,
    pub disposition: Disposition,
    pub logging_enabled: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: LogFormat,
    pub update_database: bool,
    pub updater: String,
    pub timeout: Duration,
    pub scanner_mode: ModePreference,
    pub color: Option<bool>,
    pub output: OutputFormat,
}

impl RunSettings {
    pub fn scan_configuration(&self) -> EngineResult<ScanConfiguration> {
        ScanConfiguration::builder()
            .roots(self.roots.iter().cloned())
            .exclude(self.excluded.iter().cloned())
            .exclude_files(self.exclude_files.iter().cloned())
            .batch_size(self.batch_size)
            .worker_concurrency(self.jobs)
            .disposition(self.disposition.clone())
            .logging_enabled(self.logging_enabled)
            .scan_timeout(self.timeout)
            .build()
    }
}

/// Workers to use when `--jobs` is not given; never below one
pub fn default_jobs(cpus: usize, free_cores: usize) -> usize {
    cpus.saturating_sub(free_cores).max(1)
}

/// Home of the user who invoked the program, looking through `sudo`
pub fn invoking_user_home() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(user) = std::env::var_os("SUDO_USER").filter(|u| !u.is_empty()) {
            if let Some(home) = home_of(&user) {
                return Some(home);
            }
            log::debug!("No passwd entry for SUDO_USER {:?}", user);
        }
    }
    dirs::home_dir()
}

#[cfg(unix)]
fn home_of(user: &std::ffi::OsStr) -> Option<PathBuf> {
    use std::ffi::{CStr, CString, OsString};
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    const MAX_BUFFER: usize = 1 << 20;

    let name = CString::new(user.as_bytes()).ok()?;
    let mut buffer_len = match unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) } {
        n if n > 0 => n as usize,
        _ => 1024,
    };

    loop {
        let mut buffer: Vec<libc::c_char> = vec![0; buffer_len];
        let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
        let mut found: *mut libc::passwd = std::ptr::null_mut();
        // Strings in `entry` point into `buffer`, which outlives every read below
        let rc = unsafe {
            libc::getpwnam_r(
                name.as_ptr(),
                &mut entry,
                buffer.as_mut_ptr(),
                buffer.len(),
                &mut found,
            )
        };
        if rc == libc::ERANGE && buffer_len < MAX_BUFFER {
            buffer_len *= 2;
            continue;
        }
        if rc != 0 || found.is_null() || entry.pw_dir.is_null() {
            return None;
        }

        let dir = unsafe { CStr::from_ptr(entry.pw_dir) }.to_bytes().to_vec();
        return if dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(OsString::from_vec(dir)))
        };
    }
}

impl Args {
    /// Resolve into run settings
    ///
    /// `home` is the directory defaults are placed under (see
    /// [`invoking_user_home`]); `cpus` the number of logical CPUs.
    pub fn resolve(&self, home: Option<PathBuf>, cpus: usize) -> Result<RunSettings, ValidationError> {
        if self.roots.is_empty() {
            return Err(ValidationError::new(
                "No directories to scan: pass at least one root or set 'roots' in the configuration file",
            ));
        }
        for root in &self.roots {
            if !root.is_dir() {
                return Err(ValidationError::new(&format!(
                    "Scan root is not a directory: {}",
                    root.display()
                )));
            }
        }

        let app_dir = home.map(|h| h.join(APP_DIR_NAME));

        let disposition = if self.delete {
            Disposition::Delete
        } else {
            match (&self.quarantine_dir, &app_dir) {
                (Some(dir), _) => Disposition::Quarantine(dir.clone()),
                (None, Some(app_dir)) => Disposition::Quarantine(app_dir.join(QUARANTINE_DIR_NAME)),
                (None, None) => {
                    return Err(ValidationError::new(
                        "Cannot determine a home directory for the quarantine; pass --quarantine-dir or --delete",
                    ))
                }
            }
        };

        let logging_enabled = !self.no_log;
        let log_file = if !logging_enabled || self.log_file_disabled() {
            None
        } else {
            self.log_file
                .clone()
                .or_else(|| app_dir.as_ref().map(|d| d.join(LOG_FILE_NAME)))
        };

        let mut excluded: Vec<PathBuf> = if self.no_default_excludes {
            Vec::new()
        } else {
            DEFAULT_EXCLUDED_DIRS.iter().map(PathBuf::from).collect()
        };
        for dir in &self.exclude_dirs {
            if !excluded.contains(dir) {
                excluded.push(dir.clone());
            }
        }
        // Never scan our own quarantine
        if let Disposition::Quarantine(dir) = &disposition {
            if !excluded.contains(dir) {
                excluded.push(dir.clone());
            }
        }

        let log_format = match &self.log_format {
            Some(format) => format.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };
        let output = match &self.output {
            Some(format) => format.parse::<OutputFormat>()?,
            None => OutputFormat::default(),
        };

        Ok(RunSettings {
            roots: self.roots.clone(),
            excluded,
            exclude_files: self.exclude_files.clone(),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            jobs: self
                .jobs
                .unwrap_or_else(|| default_jobs(cpus, self.free_cores.unwrap_or(0))),
            disposition,
            logging_enabled,
            log_file,
            log_level: self.log_level.clone(),
            log_format,
            update_database: !self.no_update,
            updater: self
                .updater
                .clone()
                .unwrap_or_else(|| DEFAULT_UPDATER.to_string()),
            timeout: self
                .timeout
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(DEFAULT_SCAN_TIMEOUT),
            scanner_mode: self.scanner_mode.unwrap_or_default(),
            color: self.color_override(),
            output,
        })
    }
}
