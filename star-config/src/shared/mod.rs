//! Shared configuration types for the loader and its components.

mod base;
mod connection;
mod load;
mod loader;

pub use base::ValidationError;
pub use connection::{
    DefaultPgConnectionOptions, IntoConnectOptions, PgConnectionConfig, TlsConfig,
};
pub use load::{EmptyDimensionPolicy, LoadConfig};
pub use loader::LoaderConfig;
