// ── Scan cache ──
//
// Holds the most recent scan result. Freshness is recomputed against the
// caller's clock on every read.

use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::ScanResult;

pub struct ScanCache {
    window: Duration,
    entry: RwLock<Option<ScanResult>>,
}

impl ScanCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entry: RwLock::new(None),
        }
    }

    /// Replace the cached result.
    pub fn store(&self, result: ScanResult) {
        if let Ok(mut entry) = self.entry.write() {
            *entry = Some(result);
        }
    }

    /// The cached result regardless of age.
    pub fn get(&self) -> Option<ScanResult> {
        self.entry.read().ok().and_then(|entry| entry.clone())
    }

    /// The cached result if it is no older than the window at `now`.
    pub fn get_fresh(&self, now: DateTime<Utc>) -> Option<ScanResult> {
        self.get().filter(|result| result.is_fresh(now, self.window))
    }

    pub fn clear(&self) {
        if let Ok(mut entry) = self.entry.write() {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubnetPrefix;

    fn result_at(at: DateTime<Utc>) -> ScanResult {
        ScanResult::new(at, SubnetPrefix::new(192, 168, 1), Vec::new(), Duration::from_secs(3))
    }

    #[test]
    fn freshness_is_recomputed_per_read() {
        let cache = ScanCache::new(Duration::from_secs(60));
        let taken = Utc::now();
        cache.store(result_at(taken));

        assert!(cache.get_fresh(taken + chrono::Duration::seconds(30)).is_some());
        assert!(cache.get_fresh(taken + chrono::Duration::seconds(61)).is_none());
        assert!(cache.get().is_some());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ScanCache::new(Duration::from_secs(60));
        cache.store(result_at(Utc::now()));
        cache.clear();
        assert!(cache.get().is_none());
    }
}
