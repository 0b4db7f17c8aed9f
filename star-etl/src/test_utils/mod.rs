//! Helpers shared by unit and integration tests.

#[cfg(feature = "test-utils")]
pub mod database;
pub mod rows;
#[cfg(feature = "test-utils")]
pub mod schema;
