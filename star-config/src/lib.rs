//! Configuration for the star-schema loader.
//!
//! Holds the connection descriptors of the transactional and reporting stores, the load settings
//! and the layered loader that reads them from files and `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config, load_config_from};
