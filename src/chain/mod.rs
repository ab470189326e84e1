pub mod rpc;

use std::future::Future;

use crate::error::ChainError;

pub use rpc::RpcChainClient;

/// A mined transaction as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTx {
    pub hash: String,
    /// Calldata size in bytes.
    pub data_length: usize,
    pub gas_limit: u128,
    /// Wei per gas unit.
    pub gas_price: u128,
    /// Wei.
    pub value: u128,
}

/// A block body with full transaction objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub number: u64,
    pub timestamp: i64,
    pub transactions: Vec<ChainTx>,
}

/// Upstream node access needed by the block correlator.
pub trait ChainClient: Send + Sync + 'static {
    fn fetch_block_with_transactions(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<ChainBlock, ChainError>> + Send;
}
