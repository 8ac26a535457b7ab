pub mod batch;

pub use batch::{SequenceBatch, TimeSeriesBatch};
