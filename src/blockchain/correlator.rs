use std::sync::Arc;

use log::{debug, error, warn};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::block::{BlockSample, block_key};
use crate::chain::{ChainClient, ChainTx};
use crate::error::ChainError;
use crate::sighting::SightingTracker;
use crate::store::SharedStore;
use crate::transaction::{TxSample, wei_to_ether, wei_to_gwei};

/// Outcome of handling one block event.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReport {
    pub number: u64,
    pub tx_count: usize,
    pub unseen: usize,
    /// Sightings recorded since the previous block.
    pub pending: u64,
    pub sample: BlockSample,
}

/// Matches mined transactions against their sightings and stores one
/// [`BlockSample`] per block. Callers must feed blocks one at a time.
pub struct BlockCorrelator<C> {
    chain: Arc<C>,
    sightings: Arc<SightingTracker>,
    blocks: SharedStore,
}

impl<C: ChainClient> BlockCorrelator<C> {
    pub fn new(chain: Arc<C>, sightings: Arc<SightingTracker>, blocks: SharedStore) -> Self {
        Self {
            chain,
            sightings,
            blocks,
        }
    }

    /// Correlates block `number`, captured at `now` (unix seconds).
    pub async fn handle_block(&self, number: u64, now: i64) -> Result<BlockReport, ChainError> {
        let block = self.chain.fetch_block_with_transactions(number).await?;

        let mut txs = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            let seen_at = match self.sightings.consume(&tx.hash) {
                Ok(seen_at) => seen_at,
                Err(err) => {
                    warn!("Error (txs.get({})): {err}", tx.hash);
                    continue;
                }
            };
            match seen_at {
                Some(seen_at) => {
                    txs.push(seen_sample(tx, now - seen_at).unwrap_or(TxSample::Unseen));
                }
                None => txs.push(TxSample::Unseen),
            }
        }

        let sample = BlockSample {
            captured_at: now,
            txs,
        };
        match sample.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = self.blocks.put(block_key(number), bytes) {
                    error!("Error (blocks.put(#{number})): {err}");
                }
            }
            Err(err) => error!("Error (blocks.encode(#{number})): {err}"),
        }

        debug!(
            "Block #{number}: header time {}, captured at {now}",
            block.timestamp
        );

        Ok(BlockReport {
            number,
            tx_count: block.transactions.len(),
            unseen: sample.unseen_count(),
            pending: self.sightings.take_pending_count(),
            sample,
        })
    }
}

fn seen_sample(tx: &ChainTx, wait_duration: i64) -> Option<TxSample> {
    let (Some(gas_limit), Some(gas_price_gwei), Some(value)) = (
        Decimal::from_u128(tx.gas_limit),
        wei_to_gwei(tx.gas_price),
        wei_to_ether(tx.value),
    ) else {
        warn!("Recording tx {} as unseen: amount out of decimal range", tx.hash);
        return None;
    };
    Some(TxSample::Seen {
        wait_duration,
        data_length: tx.data_length,
        gas_limit,
        gas_price_gwei,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainBlock;
    use crate::error::StoreError;
    use crate::store::traits::{KvStore, ScanDirection, WriteBatch};
    use crate::store::MemoryStore;
    use std::str::FromStr;

    struct FakeChain {
        block: ChainBlock,
    }

    impl ChainClient for FakeChain {
        async fn fetch_block_with_transactions(
            &self,
            number: u64,
        ) -> Result<ChainBlock, ChainError> {
            if number == self.block.number {
                Ok(self.block.clone())
            } else {
                Err(ChainError::Malformed(format!("block {number} not available")))
            }
        }
    }

    /// Fails reads for one key, delegates everything else.
    struct FlakyStore {
        inner: MemoryStore,
        broken_key: Vec<u8>,
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
            if key == self.broken_key.as_slice() {
                return Err(StoreError::backend("io error"));
            }
            self.inner.get(key)
        }
        fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
            self.inner.put(key, value)
        }
        fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
            self.inner.delete(key)
        }
        fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
            self.inner.write_batch(batch)
        }
        fn scan(
            &self,
            direction: ScanDirection,
            limit: Option<usize>,
        ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
            self.inner.scan(direction, limit)
        }
    }

    fn tx(hash: &str) -> ChainTx {
        ChainTx {
            hash: hash.to_string(),
            data_length: 4,
            gas_limit: 21_000,
            gas_price: 31_500_000_000,
            value: 500_000_000_000_000_000,
        }
    }

    fn chain(number: u64, hashes: &[&str]) -> Arc<FakeChain> {
        Arc::new(FakeChain {
            block: ChainBlock {
                number,
                timestamp: 0,
                transactions: hashes.iter().map(|h| tx(h)).collect(),
            },
        })
    }

    #[tokio::test]
    async fn wait_duration_is_capture_minus_sighting() {
        let sightings = Arc::new(SightingTracker::new(Arc::new(MemoryStore::new())));
        let blocks = Arc::new(MemoryStore::new());
        sightings.observe("0xaa", 1_000);

        let correlator = BlockCorrelator::new(chain(7, &["0xaa"]), sightings, blocks.clone());
        let report = correlator.handle_block(7, 1_042).await.unwrap();

        assert_eq!(report.tx_count, 1);
        assert_eq!(report.unseen, 0);
        assert_eq!(report.pending, 1);
        assert_eq!(
            report.sample.txs,
            vec![TxSample::Seen {
                wait_duration: 42,
                data_length: 4,
                gas_limit: Decimal::from(21_000u64),
                gas_price_gwei: Decimal::from_str("31.5").unwrap(),
                value: Decimal::from_str("0.5").unwrap(),
            }]
        );

        let stored = blocks.get(&block_key(7)).unwrap().unwrap();
        assert_eq!(BlockSample::from_bytes(&stored).unwrap(), report.sample);
    }

    #[tokio::test]
    async fn unmatched_hash_becomes_unseen() {
        let sightings = Arc::new(SightingTracker::new(Arc::new(MemoryStore::new())));
        let blocks = Arc::new(MemoryStore::new());
        sightings.observe("0xaa", 1_000);

        let correlator =
            BlockCorrelator::new(chain(8, &["0xaa", "0xbb"]), sightings.clone(), blocks);
        let report = correlator.handle_block(8, 1_010).await.unwrap();

        assert_eq!(report.unseen, 1);
        assert_eq!(report.sample.txs[1], TxSample::Unseen);
        assert_eq!(sightings.take_pending_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_skips_only_that_transaction() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            broken_key: b"0xbb".to_vec(),
        });
        let sightings = Arc::new(SightingTracker::new(store));
        sightings.observe("0xaa", 1_000);
        sightings.observe("0xcc", 1_000);

        let correlator = BlockCorrelator::new(
            chain(9, &["0xaa", "0xbb", "0xcc"]),
            sightings,
            Arc::new(MemoryStore::new()),
        );
        let report = correlator.handle_block(9, 1_005).await.unwrap();

        assert_eq!(report.tx_count, 3);
        assert_eq!(report.sample.txs.len(), 2);
        assert_eq!(report.unseen, 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_returned() {
        let sightings = Arc::new(SightingTracker::new(Arc::new(MemoryStore::new())));
        let correlator =
            BlockCorrelator::new(chain(1, &[]), sightings, Arc::new(MemoryStore::new()));
        assert!(correlator.handle_block(2, 0).await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_amount_is_recorded_as_unseen() {
        let sightings = Arc::new(SightingTracker::new(Arc::new(MemoryStore::new())));
        sightings.observe("0xaa", 1_000);
        let mut huge = tx("0xaa");
        huge.gas_limit = u128::MAX;
        let chain = Arc::new(FakeChain {
            block: ChainBlock {
                number: 3,
                timestamp: 0,
                transactions: vec![huge],
            },
        });

        let correlator = BlockCorrelator::new(chain, sightings, Arc::new(MemoryStore::new()));
        let report = correlator.handle_block(3, 1_010).await.unwrap();

        assert_eq!(report.tx_count, 1);
        assert_eq!(report.sample.txs, vec![TxSample::Unseen]);
        assert_eq!(report.unseen, 1);
    }
}
