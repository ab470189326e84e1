use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};

use crate::blockchain::BlockSample;
use crate::error::{RecordError, StoreError};
use crate::sighting::parse_timestamp;
use crate::store::{ScanDirection, SharedStore, WriteBatch};

/// Default purge period, in seconds.
pub const PURGE_PERIOD_SECS: u64 = 60;

/// Default retention ceiling: two days, in seconds.
pub const MAX_AGE_SECS: i64 = 2 * 24 * 60 * 60;

/// Reads the record timestamp out of a stored value.
pub type TimestampFn = fn(&[u8]) -> Result<i64, RecordError>;

/// Timestamp of a block record (its capture time).
pub fn block_timestamp(raw: &[u8]) -> Result<i64, RecordError> {
    BlockSample::from_bytes(raw).map(|block| block.captured_at)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeReport {
    pub retained: usize,
    pub purged: usize,
}

/// Periodic sweep deleting entries older than the retention ceiling.
pub struct RetentionPurger {
    name: &'static str,
    store: SharedStore,
    timestamp_of: TimestampFn,
    max_age: i64,
}

impl RetentionPurger {
    pub fn new(
        name: &'static str,
        store: SharedStore,
        timestamp_of: TimestampFn,
        max_age: i64,
    ) -> Self {
        Self {
            name,
            store,
            timestamp_of,
            max_age,
        }
    }

    /// One full ascending scan followed by a single batch delete.
    ///
    /// An entry is purged only when its age is strictly greater than the
    /// ceiling. Undecodable entries can never age out on their own, so they
    /// are purged too.
    pub fn purge_once(&self, now: i64) -> Result<PurgeReport, StoreError> {
        let entries = self.store.scan(ScanDirection::Forward, None)?;

        let mut report = PurgeReport::default();
        let mut batch = WriteBatch::new();
        for (key, value) in entries {
            match (self.timestamp_of)(&value) {
                Ok(timestamp) if now - timestamp > self.max_age => batch.delete(key),
                Ok(_) => report.retained += 1,
                Err(err) => {
                    warn!(
                        "Purging malformed {} entry {:?}: {err}",
                        self.name,
                        String::from_utf8_lossy(&key)
                    );
                    batch.delete(key);
                }
            }
        }
        report.purged = batch.len();

        if !batch.is_empty() {
            self.store.write_batch(batch)?;
        }
        info!(
            "Pruning ({}): {} retained, {} purged",
            self.name, report.retained, report.purged
        );
        Ok(report)
    }

    /// Sweeps after `initial_delay`, then every `period`, forever. Failures
    /// are logged and never stop the schedule.
    pub async fn run(self, initial_delay: Duration, period: Duration) {
        tokio::time::sleep(initial_delay).await;
        loop {
            if let Err(err) = self.purge_once(Utc::now().timestamp()) {
                error!("Error ({}.purge): {err}", self.name);
            }
            tokio::time::sleep(period).await;
        }
    }
}
