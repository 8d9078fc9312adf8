//! Store sizing and growth configuration.

mod store_config;

pub use store_config::{DEFAULT_CONFIG_TOML, StoreConfig};
