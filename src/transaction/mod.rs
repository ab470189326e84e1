pub mod model;
pub mod units;

pub use model::TxSample;
pub use units::{wei_to_ether, wei_to_gwei};
