pub mod callbacks;
pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;

pub use callbacks::{Callback, ModelCheckpoint, ReduceLrOnPlateau, TrainingContext};
pub use epoch_stats::{EpochStats, History};
pub use train_config::{effective_batch_size, TrainConfig};
pub use loop_fn::train_loop;
