use std::time::Duration;

use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::{ChainBlock, ChainClient, ChainTx};
use crate::error::ChainError;

/// Most blocks announced in one poll after falling behind.
pub const MAX_CATCH_UP_BLOCKS: u64 = 16;

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: String,
    timestamp: String,
    transactions: Vec<RpcTx>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTx {
    hash: String,
    input: String,
    gas: String,
    gas_price: Option<String>,
    max_fee_per_gas: Option<String>,
    value: String,
}

/// Ethereum JSON-RPC client over HTTP, polling for new pending hashes and blocks.
pub struct RpcChainClient {
    rpc_url: String,
    client: reqwest::Client,
    poll_interval: Duration,
}

impl RpcChainClient {
    pub fn new(rpc_url: impl Into<String>, poll_interval: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            client,
            poll_interval,
        })
    }

    async fn rpc_call<R, P>(&self, method: &str, params: P) -> Result<R, ChainError>
    where
        R: DeserializeOwned,
        P: Serialize,
    {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response: Value = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(ChainError::Rpc(error.to_string()));
        }

        let result = response
            .get("result")
            .ok_or_else(|| ChainError::Malformed(format!("missing result for {method}")))?
            .clone();

        serde_json::from_value(result).map_err(|e| ChainError::Malformed(e.to_string()))
    }

    async fn create_pending_filter(&self) -> Result<String, ChainError> {
        self.rpc_call("eth_newPendingTransactionFilter", json!([]))
            .await
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let hex: String = self.rpc_call("eth_blockNumber", json!([])).await?;
        let number = parse_quantity(&hex)?;
        u64::try_from(number).map_err(|_| ChainError::Malformed(format!("block number {hex}")))
    }

    /// Feeds pending hashes and new block numbers into the channels until
    /// either receiver is dropped. Upstream errors are logged and retried;
    /// a silent upstream shows up only as missing events.
    pub async fn watch(&self, pending: mpsc::Sender<String>, blocks: mpsc::Sender<u64>) {
        let mut filter_id: Option<String> = None;
        let mut last_block: Option<u64> = None;

        loop {
            if filter_id.is_none() {
                match self.create_pending_filter().await {
                    Ok(id) => filter_id = Some(id),
                    Err(err) => error!("Error (pending filter): {err}"),
                }
            }

            if let Some(id) = filter_id.clone() {
                match self
                    .rpc_call::<Vec<String>, _>("eth_getFilterChanges", json!([id]))
                    .await
                {
                    Ok(hashes) => {
                        for hash in hashes {
                            if pending.send(hash).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        warn!("Error (eth_getFilterChanges): {err}; recreating filter");
                        filter_id = None;
                    }
                }
            }

            match self.block_number().await {
                Ok(head) => {
                    for number in blocks_to_announce(last_block, head) {
                        if blocks.send(number).await.is_err() {
                            return;
                        }
                    }
                    last_block = Some(last_block.map_or(head, |last| last.max(head)));
                }
                Err(err) => error!("Error (eth_blockNumber): {err}"),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl ChainClient for RpcChainClient {
    async fn fetch_block_with_transactions(&self, number: u64) -> Result<ChainBlock, ChainError> {
        let tag = format!("{number:#x}");
        let block: Option<RpcBlock> = self
            .rpc_call("eth_getBlockByNumber", json!([tag, true]))
            .await?;
        let block =
            block.ok_or_else(|| ChainError::Malformed(format!("block {number} not available")))?;
        debug!("fetched block {} ({} txs)", block.number, block.transactions.len());
        convert_block(block)
    }
}

/// Block numbers newer than `last`, oldest first, capped to the most recent
/// [`MAX_CATCH_UP_BLOCKS`]. The first poll only announces the head.
fn blocks_to_announce(last: Option<u64>, head: u64) -> Vec<u64> {
    match last {
        None => vec![head],
        Some(last) if head <= last => Vec::new(),
        Some(last) => {
            let start = (last + 1).max(head.saturating_sub(MAX_CATCH_UP_BLOCKS - 1));
            (start..=head).collect()
        }
    }
}

fn convert_block(block: RpcBlock) -> Result<ChainBlock, ChainError> {
    let number = u64::try_from(parse_quantity(&block.number)?)
        .map_err(|_| ChainError::Malformed(format!("block number {}", block.number)))?;
    let timestamp = i64::try_from(parse_quantity(&block.timestamp)?)
        .map_err(|_| ChainError::Malformed(format!("timestamp {}", block.timestamp)))?;

    let transactions = block
        .transactions
        .into_iter()
        .filter_map(|tx| match convert_tx(tx) {
            Ok(tx) => Some(tx),
            Err(err) => {
                warn!("Skipping tx in block #{number}: {err}");
                None
            }
        })
        .collect();

    Ok(ChainBlock {
        number,
        timestamp,
        transactions,
    })
}

fn convert_tx(tx: RpcTx) -> Result<ChainTx, ChainError> {
    let price = tx
        .gas_price
        .or(tx.max_fee_per_gas)
        .ok_or_else(|| ChainError::Malformed(format!("tx {} has no gas price", tx.hash)))?;

    Ok(ChainTx {
        data_length: data_length(&tx.input)?,
        gas_limit: parse_quantity(&tx.gas)?,
        gas_price: parse_quantity(&price)?,
        value: parse_quantity(&tx.value)?,
        hash: tx.hash,
    })
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(hex: &str) -> Result<u128, ChainError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|_| ChainError::Malformed(format!("quantity {hex}")))
}

/// Byte length of `0x`-prefixed hex data.
pub fn data_length(hex_data: &str) -> Result<usize, ChainError> {
    let digits = hex_data.strip_prefix("0x").unwrap_or(hex_data);
    hex::decode(digits)
        .map(|bytes| bytes.len())
        .map_err(|e| ChainError::Malformed(format!("data: {e}")))
}
