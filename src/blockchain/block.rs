use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::transaction::TxSample;

/// Correlated samples for one mined block, written once per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSample {
    /// Unix seconds at which the block event was handled.
    pub captured_at: i64,
    pub txs: Vec<TxSample>,
}

impl BlockSample {
    pub fn unseen_count(&self) -> usize {
        self.txs.iter().filter(|tx| tx.is_unseen()).count()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Fixed-width store key: 16 hex chars of the big-endian block number, so
/// that byte order matches numeric order.
pub fn block_key(number: u64) -> Vec<u8> {
    hex::encode(number.to_be_bytes()).into_bytes()
}

pub fn parse_block_key(key: &[u8]) -> Result<u64, RecordError> {
    let bad = || RecordError::BlockKey(String::from_utf8_lossy(key).into_owned());
    let bytes: [u8; 8] = hex::decode(key)
        .map_err(|_| bad())?
        .try_into()
        .map_err(|_| bad())?;
    Ok(u64::from_be_bytes(bytes))
}
