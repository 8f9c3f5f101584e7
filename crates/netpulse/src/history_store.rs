//! JSON-file backed result history.
//!
//! The whole history lives in one JSON array, in insertion order. Every
//! mutation rewrites the file through a sibling temp file and a rename so
//! a crash never leaves a truncated history behind.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use netpulse_core::history::newest_first;
use netpulse_core::{CoreError, HistoryStore, MeasurementResult};

pub struct FileHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<Vec<MeasurementResult>, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(&e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::Internal(format!("corrupt history file {}: {e}", self.path.display()))
        })
    }

    fn write(&self, results: &[MeasurementResult]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
        }
        let json = serde_json::to_string_pretty(results)
            .map_err(|e| CoreError::Internal(format!("failed to encode history: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(&e))?;
        debug!(path = %self.path.display(), count = results.len(), "history written");
        Ok(())
    }

    fn io_error(&self, err: &std::io::Error) -> CoreError {
        CoreError::Internal(format!("history file {}: {err}", self.path.display()))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, CoreError> {
        self.lock
            .lock()
            .map_err(|_| CoreError::Internal("history lock poisoned".into()))
    }
}

impl HistoryStore for FileHistory {
    fn append(&self, result: MeasurementResult) -> Result<(), CoreError> {
        let _guard = self.guard()?;
        let mut results = self.read()?;
        results.push(result);
        self.write(&results)
    }

    fn recent(&self, limit: usize) -> Result<Vec<MeasurementResult>, CoreError> {
        let mut results = self.list()?;
        results.truncate(limit);
        Ok(results)
    }

    fn list(&self) -> Result<Vec<MeasurementResult>, CoreError> {
        let _guard = self.guard()?;
        let mut results = self.read()?;
        newest_first(&mut results);
        Ok(results)
    }

    fn delete(&self, id: Uuid) -> Result<bool, CoreError> {
        let _guard = self.guard()?;
        let mut results = self.read()?;
        let before = results.len();
        results.retain(|r| r.id != id);
        if results.len() == before {
            return Ok(false);
        }
        self.write(&results)?;
        Ok(true)
    }

    fn clear(&self) -> Result<usize, CoreError> {
        let _guard = self.guard()?;
        let count = self.read()?.len();
        if count > 0 {
            self.write(&[])?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use netpulse_core::QualityClass;
    use pretty_assertions::assert_eq;

    use super::*;

    fn result(minute: i64, download: f64) -> MeasurementResult {
        MeasurementResult {
            id: Uuid::new_v4(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minute),
            download_mbps: download,
            upload_mbps: 10.0,
            ping_ms: 20.0,
            jitter_ms: 2.0,
            connection_type: "Ethernet".into(),
            server_label: "Cloudflare".into(),
            quality: QualityClass::Good,
        }
    }

    #[test]
    fn missing_file_is_an_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = FileHistory::new(&path);
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.clear().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn results_survive_reopening_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let first = result(0, 30.0);
        let second = result(5, 60.0);
        {
            let store = FileHistory::new(&path);
            store.append(first.clone()).unwrap();
            store.append(second.clone()).unwrap();
        }

        let reopened = FileHistory::new(&path);
        assert_eq!(reopened.list().unwrap(), vec![second.clone(), first]);
        assert_eq!(reopened.recent(1).unwrap(), vec![second]);
    }

    #[test]
    fn delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::new(dir.path().join("history.json"));
        let keep = result(0, 30.0);
        let gone = result(1, 40.0);
        store.append(keep.clone()).unwrap();
        store.append(gone.clone()).unwrap();

        assert!(store.delete(gone.id).unwrap());
        assert!(!store.delete(gone.id).unwrap());
        assert_eq!(store.list().unwrap(), vec![keep]);

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FileHistory::new(&path).list().unwrap_err();
        assert!(matches!(err, CoreError::Internal(ref m) if m.contains("corrupt")));
    }
}
