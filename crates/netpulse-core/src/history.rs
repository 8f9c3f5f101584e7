// ── Result history ──
//
// Append-only record of completed measurements. The orchestrator never
// writes here itself; callers hand finished results to a store.

use std::sync::RwLock;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::MeasurementResult;

/// Storage collaborator for measurement results.
///
/// Listings are newest first.
pub trait HistoryStore: Send + Sync {
    fn append(&self, result: MeasurementResult) -> Result<(), CoreError>;

    /// The `limit` most recent results.
    fn recent(&self, limit: usize) -> Result<Vec<MeasurementResult>, CoreError>;

    fn list(&self) -> Result<Vec<MeasurementResult>, CoreError>;

    /// Returns `false` when no result has that id.
    fn delete(&self, id: Uuid) -> Result<bool, CoreError>;

    /// Remove everything, returning how many results were dropped.
    fn clear(&self) -> Result<usize, CoreError>;
}

/// Order results newest first. Ties keep insertion order reversed.
pub fn newest_first(results: &mut [MeasurementResult]) {
    results.reverse();
    results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// In-process history, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    results: RwLock<Vec<MeasurementResult>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(results: Vec<MeasurementResult>) -> Self {
        Self {
            results: RwLock::new(results),
        }
    }
}

fn poisoned() -> CoreError {
    CoreError::Internal("history lock poisoned".into())
}

impl HistoryStore for MemoryHistory {
    fn append(&self, result: MeasurementResult) -> Result<(), CoreError> {
        self.results.write().map_err(|_| poisoned())?.push(result);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<MeasurementResult>, CoreError> {
        let mut all = self.list()?;
        all.truncate(limit);
        Ok(all)
    }

    fn list(&self) -> Result<Vec<MeasurementResult>, CoreError> {
        let mut all = self.results.read().map_err(|_| poisoned())?.clone();
        newest_first(&mut all);
        Ok(all)
    }

    fn delete(&self, id: Uuid) -> Result<bool, CoreError> {
        let mut results = self.results.write().map_err(|_| poisoned())?;
        let before = results.len();
        results.retain(|r| r.id != id);
        Ok(results.len() != before)
    }

    fn clear(&self) -> Result<usize, CoreError> {
        let mut results = self.results.write().map_err(|_| poisoned())?;
        let dropped = results.len();
        results.clear();
        Ok(dropped)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::model::QualityClass;

    fn result(minutes: i64, download_mbps: f64) -> MeasurementResult {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        MeasurementResult {
            id: Uuid::new_v4(),
            timestamp: base + Duration::minutes(minutes),
            download_mbps,
            upload_mbps: 10.0,
            ping_ms: 15.0,
            jitter_ms: 1.0,
            connection_type: "Ethernet".into(),
            server_label: "test".into(),
            quality: crate::classify::classify(download_mbps),
        }
    }

    #[test]
    fn listings_are_newest_first() {
        let store = MemoryHistory::new();
        store.append(result(0, 10.0)).unwrap();
        store.append(result(2, 30.0)).unwrap();
        store.append(result(1, 20.0)).unwrap();

        let speeds: Vec<f64> = store.list().unwrap().iter().map(|r| r.download_mbps).collect();
        assert_eq!(speeds, vec![30.0, 20.0, 10.0]);

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].quality, QualityClass::Good);
    }

    #[test]
    fn delete_by_id() {
        let store = MemoryHistory::new();
        let keep = result(0, 10.0);
        let gone = result(1, 20.0);
        let gone_id = gone.id;
        store.append(keep.clone()).unwrap();
        store.append(gone).unwrap();

        assert!(store.delete(gone_id).unwrap());
        assert!(!store.delete(gone_id).unwrap());
        assert_eq!(store.list().unwrap(), vec![keep]);
    }

    #[test]
    fn clear_reports_count() {
        let store = MemoryHistory::with_results(vec![result(0, 1.0), result(1, 2.0)]);
        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.list().unwrap().is_empty());
    }
}
