//! Single-instance guard backed by a PID file.
//!
//! A PID file naming a live process blocks startup. A missing, unreadable or
//! stale file is overwritten with our own pid. The file is removed when the
//! guard drops.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PidFileError;

/// Held for the life of the process.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claim `path` for this process.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let path = path.into();
        let own_pid = std::process::id();

        match fs::read_to_string(&path) {
            Ok(contents) => match contents.trim().parse::<i32>() {
                Ok(pid) if pid > 0 && pid as u32 != own_pid && process_alive(pid) => {
                    return Err(PidFileError::AlreadyRunning { pid, path });
                }
                Ok(pid) => debug!(pid, path = %path.display(), "Replacing stale PID file"),
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable PID file"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(PidFileError::Io { path, source }),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PidFileError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, own_pid.to_string()).map_err(|source| PidFileError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove PID file");
        }
    }
}

/// Signal 0 probes for existence without delivering anything. A process owned
/// by another user (EPERM) is treated as not ours.
#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    // SAFETY: kill with signal 0 performs only permission and existence checks.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_own_pid_and_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulture.pid");
        {
            let guard = PidFile::acquire(&path).unwrap();
            assert_eq!(guard.path(), path.as_path());
            let written = fs::read_to_string(&path).unwrap();
            assert_eq!(written, std::process::id().to_string());
        }
        assert!(!path.exists());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/nested/vulture.pid");
        let _guard = PidFile::acquire(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn garbage_contents_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulture.pid");
        fs::write(&path, "not a pid").unwrap();
        let _guard = PidFile::acquire(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn own_pid_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulture.pid");
        fs::write(&path, std::process::id().to_string()).unwrap();
        assert!(PidFile::acquire(&path).is_ok());
    }

    #[test]
    fn non_positive_pid_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulture.pid");
        fs::write(&path, "0").unwrap();
        assert!(PidFile::acquire(&path).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn live_process_blocks_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulture.pid");
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        fs::write(&path, child.id().to_string()).unwrap();

        let result = PidFile::acquire(&path);
        child.kill().unwrap();
        child.wait().unwrap();

        match result {
            Err(PidFileError::AlreadyRunning { pid, .. }) => assert_eq!(pid as u32, child.id()),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        // The live owner's file is left alone.
        assert!(path.exists());
    }
}
