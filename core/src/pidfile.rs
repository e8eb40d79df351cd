//! PID marker files read by external stop/monitor tooling
//!
//! Format, one value per line:
//!
//! ```text
//! 12345
//! 2026-10-16T09:30:00.123456789+02:00
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("cannot write pid file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read pid file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("pid file {path:?} is malformed")]
    Malformed { path: PathBuf },
}

/// Contents of a marker file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub started_at: DateTime<Local>,
}

impl ProcessHandle {
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            started_at: Local::now(),
        }
    }

    fn render(&self) -> String {
        format!("{}\n{}\n", self.pid, self.started_at.to_rfc3339())
    }

    fn parse(contents: &str) -> Option<Self> {
        let mut lines = contents.lines();
        let pid = lines.next()?.trim().parse().ok()?;
        let started_at = DateTime::parse_from_rfc3339(lines.next()?.trim())
            .ok()?
            .with_timezone(&Local);
        Some(Self { pid, started_at })
    }

    pub fn read(path: &Path) -> Result<Self, PidFileError> {
        let contents = fs::read_to_string(path).map_err(|e| PidFileError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents).ok_or_else(|| PidFileError::Malformed {
            path: path.to_path_buf(),
        })
    }
}

/// Marker for the running process, removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    handle: ProcessHandle,
}

impl PidFile {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let path = path.into();
        let handle = ProcessHandle::current();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PidFileError::Write {
                path: path.clone(),
                source: e,
            })?;
        }
        fs::write(&path, handle.render()).map_err(|e| PidFileError::Write {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(path = %path.display(), pid = handle.pid, "PID file written");
        Ok(Self { path, handle })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> &ProcessHandle {
        &self.handle
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // Another instance may have taken the marker over since we wrote it
        match ProcessHandle::read(&self.path) {
            Ok(current) if current.pid == self.handle.pid => {
                if let Err(e) = fs::remove_file(&self.path) {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove PID file");
                }
            }
            Ok(current) => tracing::debug!(
                path = %self.path.display(),
                owner = current.pid,
                "PID file owned by another process, leaving it"
            ),
            Err(e) => tracing::debug!(error = %e, "PID file already gone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_written_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("finder.pid");

        let marker = PidFile::create(&path).unwrap();
        assert_eq!(marker.path(), path);
        let on_disk = ProcessHandle::read(&path).unwrap();
        assert_eq!(on_disk.pid, std::process::id());
        assert_eq!(
            on_disk.started_at.timestamp(),
            marker.handle().started_at.timestamp()
        );

        drop(marker);
        assert!(!path.exists());
    }

    #[test]
    fn test_foreign_marker_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.pid");

        let marker = PidFile::create(&path).unwrap();
        fs::write(&path, "1\n2026-01-01T00:00:00+00:00\n").unwrap();
        drop(marker);

        assert!(path.exists());
        assert_eq!(ProcessHandle::read(&path).unwrap().pid, 1);
    }

    #[test]
    fn test_malformed_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pid");
        fs::write(&path, "not-a-pid\n").unwrap();
        assert!(matches!(
            ProcessHandle::read(&path),
            Err(PidFileError::Malformed { .. })
        ));
    }
}
