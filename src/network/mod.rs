pub mod builder;
pub mod config;
pub mod network;

pub use builder::AeBiGruNetwork;
pub use config::{NetworkConfig, UnitsSpec};
pub use network::Network;
