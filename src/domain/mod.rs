//! Core domain types and logic.

pub mod aggregator;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod reconcile;
pub mod record;
pub mod report_row;
pub mod screen;
pub mod scoring;
pub mod settings;
pub mod symbols;
pub mod units;
pub mod weekly;
