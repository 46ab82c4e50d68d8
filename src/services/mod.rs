//! Business logic services.

pub mod advisor;
pub mod classifier;
pub mod correlator;
pub mod extractor;
pub mod pipeline;
pub mod run_source;
pub mod test_import;

pub use advisor::{Advisor, OpenAiAdvisor};
pub use pipeline::{BatchSummary, Pipeline, start_collection_task};
pub use run_source::{GitHubRunSource, RunSource};
pub use test_import::import_test_results;
