//! Postgres building blocks shared by the loader crates.

pub mod sqlx;
pub mod types;
