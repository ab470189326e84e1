use std::sync::Arc;

use chrono::Utc;
use log::{error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::blockchain::BlockCorrelator;
use crate::chain::{ChainClient, RpcChainClient};
use crate::config::Config;
use crate::purger::{RetentionPurger, block_timestamp};
use crate::sighting::{SightingTracker, parse_timestamp};
use crate::stats::{LatestSnapshot, StatsDumper};
use crate::store::SharedStore;
use crate::watchdog::{Canary, Watchdog, force_exit};

/// Everything one monitoring run owns: stores, tracker, liveness stamp and
/// the latest published snapshot.
pub struct Session<C> {
    config: Config,
    chain: Arc<C>,
    sightings_store: SharedStore,
    blocks_store: SharedStore,
    sightings: Arc<SightingTracker>,
    canary: Canary,
    latest: LatestSnapshot,
}

/// Running tasks of a started [`Session`].
pub struct SessionHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SessionHandle {
    /// Aborts every task. Nothing in flight is flushed.
    pub fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

impl<C: ChainClient> Session<C> {
    pub fn new(
        config: Config,
        chain: Arc<C>,
        sightings_store: SharedStore,
        blocks_store: SharedStore,
    ) -> Self {
        let sightings = Arc::new(SightingTracker::new(sightings_store.clone()));
        Self {
            config,
            chain,
            sightings_store,
            blocks_store,
            sightings,
            canary: Canary::new(Utc::now().timestamp()),
            latest: LatestSnapshot::default(),
        }
    }

    pub fn canary(&self) -> Canary {
        self.canary.clone()
    }

    pub fn latest(&self) -> LatestSnapshot {
        self.latest.clone()
    }

    /// Spawns the event consumers, purge loops, dump loop and watchdog.
    /// Events are fed through the returned senders.
    pub fn start(&self) -> (SessionHandle, mpsc::Sender<String>, mpsc::Sender<u64>) {
        let (pending_tx, pending_rx) = mpsc::channel(self.config.channel_capacity);
        let (block_tx, block_rx) = mpsc::channel(self.config.channel_capacity);

        let correlator = BlockCorrelator::new(
            self.chain.clone(),
            self.sightings.clone(),
            self.blocks_store.clone(),
        );
        let txs_purger = RetentionPurger::new(
            "txs",
            self.sightings_store.clone(),
            parse_timestamp,
            self.config.max_age,
        );
        let blocks_purger = RetentionPurger::new(
            "blocks",
            self.blocks_store.clone(),
            block_timestamp,
            self.config.max_age,
        );
        let dumper = StatsDumper::new(
            self.blocks_store.clone(),
            self.config.stats_block_count,
            self.config.output_path(),
            self.latest.clone(),
        );
        let watchdog = Watchdog::new(self.canary.clone(), self.config.max_disconnect);

        let period = self.config.purge_period;
        let tasks = vec![
            tokio::spawn(consume_pending(
                pending_rx,
                self.sightings.clone(),
                self.canary.clone(),
            )),
            tokio::spawn(consume_blocks(block_rx, correlator, self.canary.clone())),
            tokio::spawn(txs_purger.run(std::time::Duration::ZERO, period)),
            // Staggered by half a period to spread the I/O.
            tokio::spawn(blocks_purger.run(period / 2, period)),
            tokio::spawn(dumper.run(self.config.dump_period)),
            tokio::spawn(watchdog.run(self.config.watchdog_interval, force_exit)),
        ];

        (SessionHandle { tasks }, pending_tx, block_tx)
    }
}

impl Session<RpcChainClient> {
    /// Starts the session and connects it to the upstream node.
    pub fn start_with_upstream(&self) -> SessionHandle {
        let (mut handle, pending_tx, block_tx) = self.start();
        let chain = self.chain.clone();
        handle.tasks.push(tokio::spawn(async move {
            chain.watch(pending_tx, block_tx).await;
        }));
        info!("Upstream watcher started ({})", self.config.rpc_url);
        handle
    }
}

async fn consume_pending(
    mut rx: mpsc::Receiver<String>,
    sightings: Arc<SightingTracker>,
    canary: Canary,
) {
    while let Some(hash) = rx.recv().await {
        let now = Utc::now().timestamp();
        canary.touch(now);
        sightings.observe(&hash, now);
    }
}

/// Single consumer: one block is fully correlated and stored before the
/// next is taken off the queue.
async fn consume_blocks<C: ChainClient>(
    mut rx: mpsc::Receiver<u64>,
    correlator: BlockCorrelator<C>,
    canary: Canary,
) {
    while let Some(number) = rx.recv().await {
        let now = Utc::now().timestamp();
        canary.touch(now);
        match correlator.handle_block(number, now).await {
            Ok(report) => info!(
                "Block: #{} ({} transactions; {} unseen; +{} pending)",
                report.number, report.tx_count, report.unseen, report.pending
            ),
            Err(err) => error!("Error (block #{number}): {err}"),
        }
    }
}
