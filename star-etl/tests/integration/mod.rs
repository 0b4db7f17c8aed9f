mod pipeline_test;
mod reporting_store_test;
mod source_test;
