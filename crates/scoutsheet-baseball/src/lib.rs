// Fantasy baseball reports built on the reconciler: configuration, local
// CSV inputs and the evaluate / prospects / keepers / combine / budget
// pipelines.

pub mod config;
pub mod pipeline;
pub mod rankings;
pub mod roster;

pub use config::{load_config, Config, ConfigError};
pub use rankings::{LoadError, RankingSource};
pub use roster::Side;
