//! Shell-script stand-ins for `clamscan` and `clamdscan`
//!
//! They follow the ClamAV exit code contract: 0 clean, 1 found, 2 error.
//! A file is "infected" when it contains the EICAR-TEST part of
//! [`super::fixtures::INFECTED_MARKER`].

use std::fs;
use std::path::{Path, PathBuf};

const DETECTING_SCRIPT: &str = r#"#!/bin/sh
for last; do :; done
if [ ! -r "$last" ]; then
    echo "$last: Can't open file or directory ERROR"
    exit 2
fi
if grep -qF 'EICAR-TEST' "$last"; then
    echo "$last: Eicar-Test-Signature FOUND"
    exit 1
fi
echo "$last: OK"
exit 0
"#;

const UNREACHABLE_DAEMON_SCRIPT: &str = r#"#!/bin/sh
echo "ERROR: Could not connect to clamd on LocalSocket /run/clamav/clamd.ctl: No such file or directory" >&2
exit 2
"#;

/// Install a detecting scanner named `name` into `bin_dir`
#[cfg(unix)]
pub fn install(bin_dir: &Path, name: &str) -> PathBuf {
    write_executable(bin_dir, name, DETECTING_SCRIPT)
}

/// Install a scanner that fails every file as if clamd had gone away
#[cfg(unix)]
pub fn install_unreachable_daemon(bin_dir: &Path, name: &str) -> PathBuf {
    write_executable(bin_dir, name, UNREACHABLE_DAEMON_SCRIPT)
}

#[cfg(unix)]
fn write_executable(bin_dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(bin_dir).unwrap();
    let path = bin_dir.join(name);
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}
