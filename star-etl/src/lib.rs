//! Star-schema loading for a normalized transactional store.
//!
//! Each build extracts rows from the transactional store through a [`source::Source`], reshapes
//! them in [`transform`] and replaces the target table of the reporting store through a
//! [`store::ReportingStore`]. The [`pipeline::Pipeline`] sequences the builds so that dimension
//! tables are committed before the fact build resolves its surrogate keys against them.

pub mod builds;
pub mod contract;
pub mod error;
pub mod load;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transform;
pub mod types;
