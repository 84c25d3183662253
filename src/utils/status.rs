// src/utils/status.rs: per-run status files gating downstream stages

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of a pipeline run, persisted as the sole line of a status file.
/// Single writer, single reader per run; no locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "COMPLETED",
            StageStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True iff the status file exists and records a completed run. A missing
/// file, a FAILED marker, or any unrecognized content all gate downstream
/// stages off.
pub fn succeeded(path: &Path) -> bool {
    match fs::read_to_string(path) {
        Ok(content) => content.lines().next() == Some(StageStatus::Completed.as_str()),
        Err(_) => false,
    }
}

/// Overwrites the status file with exactly one line naming the status.
pub fn write(path: &Path, status: StageStatus) -> io::Result<()> {
    fs::write(path, format!("{}\n", status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_completed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.log");
        write(&path, StageStatus::Completed).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "COMPLETED\n");
        assert!(succeeded(&path));
    }

    #[test]
    fn failed_marker_gates_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.log");
        write(&path, StageStatus::Failed).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "FAILED\n");
        assert!(!succeeded(&path));
    }

    #[test]
    fn missing_or_garbage_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!succeeded(&dir.path().join("absent.log")));

        let path = dir.path().join("status.log");
        fs::write(&path, "banana\n").unwrap();
        assert!(!succeeded(&path));
    }

    #[test]
    fn write_overwrites_previous_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.log");
        write(&path, StageStatus::Failed).unwrap();
        write(&path, StageStatus::Completed).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "COMPLETED\n");
    }
}
