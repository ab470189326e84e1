use log::warn;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use super::engine::{StatResult, get_stats};
use crate::blockchain::{BlockSample, parse_block_key};
use crate::error::StoreError;
use crate::store::{KvStore, ScanDirection};
use crate::transaction::TxSample;

/// Default number of most recent blocks feeding a snapshot.
pub const STATS_BLOCK_COUNT: usize = 100;

/// Waits below this many seconds are `fast`.
pub const FAST_SECS: i64 = 60;

/// Waits below this many seconds (and not fast) are `medium`.
pub const MEDIUM_SECS: i64 = 5 * 60;

/// Waits above this many seconds are ignored.
pub const MAX_WAIT_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Medium,
    Slow,
}

impl Tier {
    /// Tier of a wait duration, or `None` when it is too slow to count.
    pub fn classify(wait_duration: i64) -> Option<Tier> {
        if wait_duration > MAX_WAIT_SECS {
            None
        } else if wait_duration < FAST_SECS {
            Some(Tier::Fast)
        } else if wait_duration < MEDIUM_SECS {
            Some(Tier::Medium)
        } else {
            Some(Tier::Slow)
        }
    }
}

/// Gas prices (gwei) per tier, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierPrices {
    pub fast: Vec<f64>,
    pub medium: Vec<f64>,
    pub slow: Vec<f64>,
}

impl TierPrices {
    pub fn collect<'a>(blocks: impl IntoIterator<Item = &'a BlockSample>) -> Self {
        let mut prices = TierPrices::default();
        for block in blocks {
            for tx in &block.txs {
                let TxSample::Seen {
                    wait_duration,
                    gas_price_gwei,
                    ..
                } = tx
                else {
                    continue;
                };
                let (Some(tier), Some(price)) =
                    (Tier::classify(*wait_duration), gas_price_gwei.to_f64())
                else {
                    continue;
                };
                match tier {
                    Tier::Fast => prices.fast.push(price),
                    Tier::Medium => prices.medium.push(price),
                    Tier::Slow => prices.slow.push(price),
                }
            }
        }

        for tier in [&mut prices.fast, &mut prices.medium, &mut prices.slow] {
            tier.sort_by(|a, b| a.total_cmp(b));
        }
        prices
    }
}

/// Statistics over the most recent blocks, recomputed from scratch each time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatSnapshot {
    /// Most recent block included; `None` for an empty store.
    pub block_number: Option<u64>,
    /// Unix seconds (fractional) at capture.
    pub timestamp: f64,
    pub slow: StatResult,
    pub medium: StatResult,
    pub fast: StatResult,
}

impl StatSnapshot {
    pub fn from_blocks(blocks: &[(u64, BlockSample)], timestamp: f64) -> Self {
        let prices = TierPrices::collect(blocks.iter().map(|(_, block)| block));
        StatSnapshot {
            block_number: blocks.first().map(|(number, _)| *number),
            timestamp,
            slow: get_stats(&prices.slow),
            medium: get_stats(&prices.medium),
            fast: get_stats(&prices.fast),
        }
    }
}

/// Newest `count` block records, most recent first. Undecodable entries are
/// logged and skipped but still count toward `count`, so a store holding
/// garbage yields fewer than `count` blocks.
pub fn recent_blocks(
    store: &dyn KvStore,
    count: usize,
) -> Result<Vec<(u64, BlockSample)>, StoreError> {
    let entries = store.scan(ScanDirection::Backward, Some(count))?;
    let mut blocks = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let decoded = parse_block_key(&key)
            .and_then(|number| BlockSample::from_bytes(&value).map(|block| (number, block)));
        match decoded {
            Ok(entry) => blocks.push(entry),
            Err(err) => warn!("Skipping block record: {err}"),
        }
    }
    Ok(blocks)
}
