//! CI Insights library.
//!
//! Extracts why CI runs failed, correlates failures with workflow
//! definitions, classifies them, and stores the results for trend queries.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
