//! Core CLI arguments structure
//!
//! Every option is optional here so that values from the configuration file
//! can fill whatever the command line left unset. Resolution into concrete
//! run settings happens in [`super::settings`].

use crate::core::validation::{
    validate_glob_pattern, validate_log_level, validate_output_format, validate_positive_int,
};
use crate::scanner::command::ModePreference;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "clamsweep")]
#[command(about = "Parallel ClamAV scan of directory trees")]
#[command(version)]
#[command(after_help = " * can be specified multiple times or as a comma-separated list\n\n\
Exit status: 0 clean, 1 infected files found, 2 error, 130 interrupted")]
pub struct Args {
    /// Directories to scan*
    #[arg(value_name = "ROOTS", value_delimiter = ',')]
    pub roots: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Directories to skip, with everything below them*
    #[arg(short = 'x', long = "exclude-dir", value_name = "DIRS", action = ArgAction::Append, value_delimiter = ',')]
    pub exclude_dirs: Vec<PathBuf>,

    /// Do not skip /proc, /sys, /dev, /run, /tmp, /var/lib and /var/run
    #[arg(long = "no-default-excludes")]
    pub no_default_excludes: bool,

    /// File name patterns to skip* (e.g. '*.iso')
    #[arg(long = "exclude-files", value_name = "PATTERNS", action = ArgAction::Append, value_delimiter = ',', value_parser = validate_glob_pattern)]
    pub exclude_files: Vec<String>,

    /// Files per batch handed to a worker [default: 500]
    #[arg(short = 'b', long = "batch-size", value_name = "COUNT", value_parser = validate_positive_int)]
    pub batch_size: Option<usize>,

    /// Parallel workers [default: CPU count minus --free-cores]
    #[arg(short = 'j', long = "jobs", value_name = "COUNT", value_parser = validate_positive_int)]
    pub jobs: Option<usize>,

    /// CPU cores to leave idle when --jobs is not given
    #[arg(long = "free-cores", value_name = "COUNT")]
    pub free_cores: Option<usize>,

    /// Move infected files here [default: ~/clamsweep/quarantine]
    #[arg(short = 'q', long = "quarantine-dir", value_name = "DIR", conflicts_with = "delete")]
    pub quarantine_dir: Option<PathBuf>,

    /// Delete infected files instead of quarantining them
    #[arg(short = 'D', long = "delete")]
    pub delete: bool,

    /// Skip the signature database update
    #[arg(long = "no-update")]
    pub no_update: bool,

    /// Database update command [default: freshclam]
    #[arg(long = "updater", value_name = "COMMAND")]
    pub updater: Option<String>,

    /// Per-file scan timeout in seconds [default: 300]
    #[arg(short = 't', long = "timeout", value_name = "SECONDS", value_parser = validate_positive_int)]
    pub timeout: Option<usize>,

    /// Scanner selection: auto, daemon (clamdscan) or standalone (clamscan)
    #[arg(short = 'm', long = "scanner-mode", value_name = "MODE", value_parser = ModePreference::from_str)]
    pub scanner_mode: Option<ModePreference>,

    /// Disable the scan log file and detection log entries
    #[arg(long = "no-log")]
    pub no_log: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = validate_log_level)]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging) [default: ~/clamsweep/clamsweep.log]
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Summary output format
    #[arg(short = 'o', long = "output", value_name = "FORMAT", value_parser = validate_output_format)]
    pub output: Option<String>,

    /// Force coloured output
    #[arg(long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit colour choice, `None` meaning auto-detect
    pub fn color_override(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// `--log-file none` or `-` turns file logging off
    pub fn log_file_disabled(&self) -> bool {
        self.log_file
            .as_deref()
            .and_then(|p| p.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case("none") || s == "-")
    }
}
