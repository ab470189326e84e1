pub mod block;
pub mod correlator;

pub use block::{BlockSample, block_key, parse_block_key};
pub use correlator::BlockCorrelator;
