pub mod memory;
pub mod sled_store;
pub mod traits;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use traits::{KvStore, ScanDirection, WriteBatch};

/// Tree holding first-seen timestamps keyed by transaction hash.
pub const SIGHTINGS_TREE: &str = "txs";

/// Tree holding one sample record per mined block.
pub const BLOCKS_TREE: &str = "blocks";

pub type SharedStore = Arc<dyn KvStore>;
