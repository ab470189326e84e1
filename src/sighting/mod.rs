use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use crate::error::{RecordError, SightingError};
use crate::store::SharedStore;

/// Records when each pending transaction was first observed.
pub struct SightingTracker {
    store: SharedStore,
    pending: AtomicU64,
}

impl SightingTracker {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            pending: AtomicU64::new(0),
        }
    }

    /// Upserts `hash -> now`; a repeated sighting overwrites the earlier one.
    /// Store failures are logged and the hash is dropped.
    pub fn observe(&self, hash: &str, now: i64) {
        let value = now.to_string().into_bytes();
        match self.store.put(hash.as_bytes().to_vec(), value) {
            Ok(()) => {
                self.pending.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => warn!("Error (txs.put({hash}, {now})): {err}"),
        }
    }

    /// Resolves and removes the sighting for `hash`. `Ok(None)` means the
    /// transaction was never observed pending.
    pub fn consume(&self, hash: &str) -> Result<Option<i64>, SightingError> {
        let Some(raw) = self.store.get(hash.as_bytes())? else {
            return Ok(None);
        };
        let seen_at = parse_timestamp(&raw)?;

        // A leftover entry is harmless; the purger collects it later.
        if let Err(err) = self.store.delete(hash.as_bytes()) {
            debug!("Error (txs.del({hash})): {err}");
        }
        Ok(Some(seen_at))
    }

    /// Sightings recorded since the previous call.
    pub fn take_pending_count(&self) -> u64 {
        self.pending.swap(0, Ordering::Relaxed)
    }
}

/// Decodes a sighting value (decimal seconds).
pub fn parse_timestamp(raw: &[u8]) -> Result<i64, RecordError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| RecordError::Timestamp(String::from_utf8_lossy(raw).into_owned()))
}
