//! Pre-flight checks for pystacker
//!
//! Validates the environment before any capture is attempted and gives clear,
//! actionable error messages when something is missing.

#![allow(unsafe_code)] // kill(2) and geteuid(2) require unsafe

use anyhow::{bail, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::domain::Pid;

#[cfg(windows)]
pub const SAMPLER_BINARY: &str = "py-spy.exe";
#[cfg(not(windows))]
pub const SAMPLER_BINARY: &str = "py-spy";

/// Find the sampler binary.
///
/// Order: `explicit` (config or `--sampler`), `bin/` next to the pystacker
/// executable, then `PATH`.
pub fn locate_sampler(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        bail!(
            "py-spy not found at {}\n\n\
             Check samplerPath in your settings or the --sampler flag.",
            path.display()
        );
    }

    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("bin").join(SAMPLER_BINARY)));
    if let Some(path) = bundled.filter(|p| p.is_file()) {
        debug!("Using bundled sampler {}", path.display());
        return Ok(path);
    }

    if let Some(path) = find_in_path(SAMPLER_BINARY, std::env::var_os("PATH").as_deref()) {
        debug!("Using sampler from PATH: {}", path.display());
        return Ok(path);
    }

    bail!(
        "py-spy not found.\n\n\
         Install it next to pystacker with: cargo xtask setup-sampler\n\
         or put py-spy on your PATH, or set samplerPath in the settings file."
    )
}

fn find_in_path(binary: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    std::env::split_paths(path_var?).map(|dir| dir.join(binary)).find(|p| p.is_file())
}

/// Check that the process to capture from exists.
pub fn check_process_exists(pid: Pid) -> Result<()> {
    if process_exists(pid) {
        return Ok(());
    }
    bail!(
        "Process {} not found.\n\n\
         Is the process still running? Check with: ps -p {}",
        pid.0,
        pid.0
    );
}

#[cfg(unix)]
fn process_exists(pid: Pid) -> bool {
    if pid.0 <= 0 {
        return false;
    }
    // Signal 0 only checks existence; EPERM means it exists but is not ours.
    if unsafe { libc::kill(pid.0, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_exists(pid: Pid) -> bool {
    pid.0 > 0
}

/// Warn when attaching will likely need more privileges than we have.
///
/// Not fatal: sampling your own processes usually works unprivileged.
pub fn warn_if_unprivileged(quiet: bool) {
    if quiet || is_root() {
        return;
    }
    eprintln!("warning: not running as root; py-spy may be denied access to other users' processes");
}

#[cfg(unix)]
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_not_found() {
        let result = check_process_exists(Pid(999_999_999));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_own_process_exists() {
        let pid = i32::try_from(std::process::id()).unwrap();
        assert!(check_process_exists(Pid(pid)).is_ok());
    }

    #[test]
    fn test_explicit_sampler_must_exist() {
        let err = locate_sampler(Some(Path::new("/nonexistent/py-spy"))).unwrap_err();
        assert!(err.to_string().contains("py-spy not found at /nonexistent/py-spy"));
    }

    #[test]
    fn test_explicit_sampler() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(locate_sampler(Some(file.path())).unwrap(), file.path());
    }

    #[test]
    fn test_find_in_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SAMPLER_BINARY), "").unwrap();
        let path_var = std::env::join_paths([Path::new("/nonexistent"), dir.path()]).unwrap();
        assert_eq!(
            find_in_path(SAMPLER_BINARY, Some(&path_var)),
            Some(dir.path().join(SAMPLER_BINARY))
        );
        assert_eq!(find_in_path(SAMPLER_BINARY, None), None);
    }
}
