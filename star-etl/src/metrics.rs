//! Metric names and labels recorded by the builds.
//!
//! Only the `metrics` facade is used here; installing a recorder is left to the binary.

/// Label for the build name in metrics.
pub const BUILD_LABEL: &str = "build";

/// Label for the error kind in metrics.
pub const ERROR_KIND_LABEL: &str = "error_kind";

/// Counter for rows read from the transactional store.
pub const STAR_ROWS_EXTRACTED_TOTAL: &str = "star_rows_extracted_total";

/// Counter for rows inserted into the reporting store.
pub const STAR_ROWS_LOADED_TOTAL: &str = "star_rows_loaded_total";

/// Counter for fact rows whose natural key had no surrogate key.
pub const STAR_UNRESOLVED_KEYS_TOTAL: &str = "star_unresolved_keys_total";

/// Counter for builds that ended with an error.
pub const STAR_BUILD_FAILURES_TOTAL: &str = "star_build_failures_total";
