use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use log::{error, info};

use super::snapshot::{StatSnapshot, recent_blocks};
use crate::error::DumpError;
use crate::store::SharedStore;

/// Default dump period, in seconds.
pub const DUMP_PERIOD_SECS: u64 = 20;

/// Most recent snapshot, shared with the HTTP handlers.
pub type LatestSnapshot = Arc<RwLock<Option<StatSnapshot>>>;

/// Writes `snapshot` as JSON via a hidden sibling file and a rename, so
/// readers never observe a partial document.
pub fn write_atomic(path: &Path, snapshot: &StatSnapshot) -> Result<(), DumpError> {
    let json = serde_json::to_vec(snapshot)?;
    let temp = temp_path(path);
    fs::write(&temp, json)?;
    fs::rename(&temp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}"))
}

/// Periodically rebuilds the snapshot from the block store and publishes it.
pub struct StatsDumper {
    blocks: SharedStore,
    block_count: usize,
    output: PathBuf,
    latest: LatestSnapshot,
}

impl StatsDumper {
    pub fn new(
        blocks: SharedStore,
        block_count: usize,
        output: PathBuf,
        latest: LatestSnapshot,
    ) -> Self {
        Self {
            blocks,
            block_count,
            output,
            latest,
        }
    }

    pub fn dump_once(&self) -> Result<StatSnapshot, DumpError> {
        let blocks = recent_blocks(self.blocks.as_ref(), self.block_count)?;
        let timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
        let snapshot = StatSnapshot::from_blocks(&blocks, timestamp);

        info!("Dump: saving {}", self.output.display());
        write_atomic(&self.output, &snapshot)?;

        match self.latest.write() {
            Ok(mut latest) => *latest = Some(snapshot.clone()),
            Err(_) => error!("Error (dump): snapshot lock poisoned"),
        }
        Ok(snapshot)
    }

    pub async fn run(self, period: Duration) {
        loop {
            if let Err(err) = self.dump_once() {
                error!("Error (dump): {err}");
            }
            tokio::time::sleep(period).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BlockSample, block_key};
    use crate::store::{KvStore, MemoryStore};
    use crate::transaction::TxSample;
    use rust_decimal::Decimal;

    #[test]
    fn dump_writes_and_publishes_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("gas-price.json");

        let blocks = Arc::new(MemoryStore::new());
        let sample = BlockSample {
            captured_at: 1,
            txs: vec![TxSample::Seen {
                wait_duration: 12,
                data_length: 0,
                gas_limit: Decimal::from(21_000u64),
                gas_price_gwei: Decimal::new(215, 1),
                value: Decimal::ZERO,
            }],
        };
        blocks.put(block_key(42), sample.to_bytes().unwrap()).unwrap();

        let latest = LatestSnapshot::default();
        let dumper = StatsDumper::new(blocks, 100, output.clone(), latest.clone());
        let snapshot = dumper.dump_once().unwrap();

        assert_eq!(snapshot.block_number, Some(42));
        assert_eq!(latest.read().unwrap().as_ref(), Some(&snapshot));
        assert!(!dir.path().join(".gas-price.json").exists());

        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(written["block_number"], 42);
        assert_eq!(written["fast"]["count"], 1);
        assert_eq!(written["fast"]["mean"], 21.5);
        assert!(written["fast"]["std_dev"].is_null());
        assert_eq!(written["slow"]["count"], 0);
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        fs::write(&output, b"stale").unwrap();

        let snapshot = StatSnapshot::from_blocks(&[], 3.0);
        write_atomic(&output, &snapshot).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(written["timestamp"], 3.0);
        assert!(written["block_number"].is_null());
    }
}
