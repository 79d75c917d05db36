//! Integration tests for the analysis pipeline

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
