use tracing::info;

use crate::storage::{Storage, StorageBackend};

/// Seconds spent on the page, persisted when the page unloads.
#[derive(Debug, Clone)]
pub struct TimeOnPage {
    key: String,
    started_at_ms: u64,
}

impl TimeOnPage {
    pub fn new(key: impl Into<String>, started_at_ms: u64) -> Self {
        Self {
            key: key.into(),
            started_at_ms,
        }
    }

    pub fn seconds_at(&self, now_ms: u64) -> u64 {
        (now_ms.saturating_sub(self.started_at_ms) + 500) / 1_000
    }

    pub fn on_unload<B: StorageBackend>(&self, storage: &mut Storage<B>, now_ms: u64) -> bool {
        let seconds = self.seconds_at(now_ms);
        info!(key = %self.key, seconds, "time spent on page");
        storage.set(&self.key, &seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::TimeOnPage;
    use crate::storage::{MemoryStorage, Storage};

    #[test]
    fn rounds_to_nearest_second() {
        let tracker = TimeOnPage::new("kulish_time_spent", 1_000);
        assert_eq!(tracker.seconds_at(2_499), 1);
        assert_eq!(tracker.seconds_at(2_500), 2);
        assert_eq!(tracker.seconds_at(0), 0);
    }

    #[test]
    fn stores_seconds_on_unload() {
        let mut storage = Storage::new(MemoryStorage::new());
        let tracker = TimeOnPage::new("koryak_time_spent", 0);
        assert!(tracker.on_unload(&mut storage, 61_400));
        assert_eq!(storage.get::<u64>("koryak_time_spent"), Some(61));
    }
}
