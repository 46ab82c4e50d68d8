//! Insight store E2E test suite.
//!
//! Runs against a temporary SQLite database per test; no external services.
//!
//! Run with: cargo test --test store_e2e

mod test_helpers;

mod test_api;
mod test_pipeline;
mod test_schema;
mod test_store;
