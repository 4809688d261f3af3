//! Infected file handling
//!
//! Applies the configured [`Disposition`] to a file the scanner flagged. A
//! failed quarantine or delete is recorded on the [`InfectedRecord`] and never
//! hides the detection itself.

use crate::scanner::backend::signature_name;
use crate::scanner::types::{Disposition, DispositionOutcome, InfectedRecord};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Applies quarantine or delete to infected files
///
/// Calls are expected to be serialized (the dispatcher only disposes from its
/// aggregation step), which keeps collision renaming race-free.
#[derive(Debug, Clone)]
pub struct InfectionHandler {
    disposition: Disposition,
}

impl InfectionHandler {
    pub fn new(disposition: Disposition) -> Self {
        Self { disposition }
    }

    pub fn disposition(&self) -> &Disposition {
        &self.disposition
    }

    pub async fn dispose(&self, path: &Path, output: String) -> InfectedRecord {
        let outcome = match &self.disposition {
            Disposition::Delete => match tokio::fs::remove_file(path).await {
                Ok(()) => DispositionOutcome::Deleted,
                Err(e) => DispositionOutcome::Failed {
                    action: "delete".to_string(),
                    reason: e.to_string(),
                },
            },
            Disposition::Quarantine(dir) => match quarantine(path, dir).await {
                Ok(destination) => DispositionOutcome::Quarantined { destination },
                Err(e) => DispositionOutcome::Failed {
                    action: "quarantine".to_string(),
                    reason: e.to_string(),
                },
            },
        };

        InfectedRecord {
            path: path.to_path_buf(),
            signature: signature_name(&output),
            output,
            disposition: outcome,
        }
    }
}

async fn quarantine(path: &Path, dir: &Path) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let destination = unique_destination(dir, path).await?;
    move_file(path, &destination).await?;
    Ok(destination)
}

/// First free name in `dir` for `source`: `name.ext`, then `name.1.ext`, `name.2.ext`, ...
async fn unique_destination(dir: &Path, source: &Path) -> io::Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;

    let candidate = dir.join(name);
    if !exists(&candidate).await? {
        return Ok(candidate);
    }

    let name_path = Path::new(name);
    let stem = name_path.file_stem().unwrap_or(name);
    let extension = name_path.extension();
    for n in 1u64.. {
        let mut file_name = OsString::from(stem);
        file_name.push(format!(".{}", n));
        if let Some(ext) = extension {
            file_name.push(".");
            file_name.push(ext);
        }
        let candidate = dir.join(file_name);
        if !exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free name left in quarantine",
    ))
}

async fn exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

async fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            log::debug!(
                "{} is on another filesystem; copying into quarantine",
                source.display()
            );
            copy_then_remove(source, destination).await
        }
        Err(e) => Err(e),
    }
}

/// Move by copy plus delete, leaving no duplicate behind on failure
pub(crate) async fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    if let Err(e) = tokio::fs::copy(source, destination).await {
        let _ = tokio::fs::remove_file(destination).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::remove_file(source).await {
        let _ = tokio::fs::remove_file(destination).await;
        return Err(e);
    }
    Ok(())
}
