//! SeaORM entity definitions.

pub mod analysis_result;
pub mod error_pattern;
pub mod pipeline_run;
pub mod store_metadata;
pub mod test_result;
