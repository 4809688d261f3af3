//! TOML configuration file parsing and loading
//!
//! Values from the configuration file only fill options the command line
//! left unset, so CLI arguments always win.

use crate::core::validation::{
    validate_glob_pattern, validate_log_level, validate_output_format, ValidationError,
};
use crate::scanner::command::ModePreference;
use std::path::{Path, PathBuf};

use super::args::Args;

pub const CONFIG_DIR_NAME: &str = "clamsweep";
pub const CONFIG_FILE_NAME: &str = "clamsweep.toml";

const KNOWN_KEYS: &[&str] = &[
    "roots",
    "exclude-dirs",
    "exclude-files",
    "default-excludes",
    "batch-size",
    "jobs",
    "free-cores",
    "quarantine-dir",
    "delete-infected",
    "logging",
    "log-file",
    "log-level",
    "log-format",
    "update-database",
    "updater",
    "timeout",
    "scanner-mode",
    "color",
    "output",
];

/// What loading the configuration file did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLoad {
    pub path: Option<PathBuf>,
    /// Keys present in the file that no option reads
    pub unknown_keys: Vec<String>,
}

/// `<config_dir>/clamsweep/clamsweep.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Args {
    /// Load the configuration file into unset options
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub async fn load_config_file(&mut self) -> Result<ConfigLoad, ValidationError> {
        let path = match self.config_file.clone() {
            Some(path) => {
                if !path.exists() {
                    return Err(ValidationError::new(&format!(
                        "The specified configuration file does not exist: {}",
                        path.display()
                    )));
                }
                path
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(ConfigLoad::default()),
            },
        };

        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ValidationError::new(&format!(
                "Error reading configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = toml::from_str::<toml::Table>(&contents).map_err(|e| {
            ValidationError::new(&format!(
                "Error parsing configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        self.apply_toml_values(&config).map_err(|e| {
            ValidationError::new(&format!(
                "Error in configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let unknown_keys = config
            .keys()
            .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();

        Ok(ConfigLoad {
            path: Some(path),
            unknown_keys,
        })
    }

    /// Apply TOML configuration values to options not given on the command line
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> Result<(), ValidationError> {
        if self.roots.is_empty() {
            self.roots = string_list(config, "roots")?
                .into_iter()
                .map(PathBuf::from)
                .collect();
        }
        if self.exclude_dirs.is_empty() {
            self.exclude_dirs = string_list(config, "exclude-dirs")?
                .into_iter()
                .map(PathBuf::from)
                .collect();
        }
        if self.exclude_files.is_empty() {
            self.exclude_files = string_list(config, "exclude-files")?
                .iter()
                .map(|p| validate_glob_pattern(p))
                .collect::<Result<_, _>>()?;
        }

        if let Some(enabled) = boolean(config, "default-excludes")? {
            self.no_default_excludes |= !enabled;
        }
        if let Some(enabled) = boolean(config, "logging")? {
            self.no_log |= !enabled;
        }
        if let Some(enabled) = boolean(config, "update-database")? {
            self.no_update |= !enabled;
        }
        if let Some(delete) = boolean(config, "delete-infected")? {
            // An explicit --quarantine-dir on the command line beats the file
            if self.quarantine_dir.is_none() {
                self.delete |= delete;
            }
        }
        if self.color_override().is_none() {
            match boolean(config, "color")? {
                Some(true) => self.color = true,
                Some(false) => self.no_color = true,
                None => {}
            }
        }

        fill(&mut self.batch_size, positive(config, "batch-size")?);
        fill(&mut self.jobs, positive(config, "jobs")?);
        fill(&mut self.timeout, positive(config, "timeout")?);
        fill(&mut self.free_cores, non_negative(config, "free-cores")?);

        if !self.delete {
            fill(
                &mut self.quarantine_dir,
                string(config, "quarantine-dir")?.map(PathBuf::from),
            );
        }
        fill(&mut self.log_file, string(config, "log-file")?.map(PathBuf::from));
        fill(&mut self.updater, string(config, "updater")?);

        if let Some(level) = string(config, "log-level")? {
            fill(&mut self.log_level, Some(validate_log_level(&level)?));
        }
        if let Some(format) = string(config, "log-format")? {
            let validated = format
                .parse::<crate::core::logging::LogFormat>()
                .map(|_| format.to_ascii_lowercase())?;
            fill(&mut self.log_format, Some(validated));
        }
        if let Some(output) = string(config, "output")? {
            fill(&mut self.output, Some(validate_output_format(&output)?));
        }
        if let Some(mode) = string(config, "scanner-mode")? {
            fill(&mut self.scanner_mode, Some(mode.parse::<ModePreference>()?));
        }

        Ok(())
    }
}

fn fill<T>(target: &mut Option<T>, value: Option<T>) {
    if target.is_none() {
        *target = value;
    }
}

/// Single string or array of strings; entries may themselves be comma separated
fn string_list(config: &toml::Table, key: &str) -> Result<Vec<String>, ValidationError> {
    let raw: Vec<&str> = match config.get(key) {
        None => return Ok(Vec::new()),
        Some(toml::Value::String(s)) => vec![s.as_str()],
        Some(toml::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    ValidationError::new(&format!("'{}' must contain only strings", key))
                })
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(ValidationError::new(&format!(
                "'{}' must be a string or an array of strings",
                key
            )))
        }
    };

    let mut values: Vec<String> = Vec::new();
    for entry in raw.iter().flat_map(|s| s.split(',')) {
        let entry = entry.trim();
        if !entry.is_empty() && !values.iter().any(|v| v == entry) {
            values.push(entry.to_string());
        }
    }
    Ok(values)
}

fn string(config: &toml::Table, key: &str) -> Result<Option<String>, ValidationError> {
    match config.get(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::new(&format!("'{}' must be a string", key))),
    }
}

fn boolean(config: &toml::Table, key: &str) -> Result<Option<bool>, ValidationError> {
    match config.get(key) {
        None => Ok(None),
        Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(ValidationError::new(&format!(
            "'{}' must be true or false",
            key
        ))),
    }
}

fn non_negative(config: &toml::Table, key: &str) -> Result<Option<usize>, ValidationError> {
    match config.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(n)) => usize::try_from(*n).map(Some).map_err(|_| {
            ValidationError::new(&format!("'{}' must not be negative (got {})", key, n))
        }),
        Some(_) => Err(ValidationError::new(&format!("'{}' must be an integer", key))),
    }
}

fn positive(config: &toml::Table, key: &str) -> Result<Option<usize>, ValidationError> {
    match non_negative(config, key)? {
        Some(0) => Err(ValidationError::new(&format!(
            "'{}' must be greater than 0",
            key
        ))),
        other => Ok(other),
    }
}

/// Path of the configuration file the run would read, for diagnostics
pub fn describe_config_source(load: &ConfigLoad) -> String {
    load.path
        .as_deref()
        .map(Path::display)
        .map(|p| p.to_string())
        .unwrap_or_else(|| "none".to_string())
}
