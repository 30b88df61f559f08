pub mod config;
pub mod config_loader;
pub mod types;

pub use config::{AppConfig, FdrConfig, NullModelConfig};
pub use config_loader::ConfigLoader;
pub use types::{Direction, NullModelType, StrategyKind};
