pub mod dump;
pub mod engine;
pub mod snapshot;

pub use dump::{LatestSnapshot, StatsDumper};
pub use snapshot::StatSnapshot;
