//! Concrete adapter implementations for ports.

pub mod alpha_vantage;
pub mod csv_report;
pub mod csv_source;
pub mod file_config_adapter;
pub mod http;
pub mod kabutan;
pub mod markdown_report;
pub mod weekly_report;
pub mod yahoo_jp;
