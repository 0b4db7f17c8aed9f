//! Reshaping of extracted rows into the column sets of the reporting tables.

mod dimension;
mod fact;

pub use dimension::{transform_category, transform_product};
pub use fact::{FactTransform, transform_order_metrics};
