//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod engle_granger;
pub mod file_config_adapter;
pub mod svg_report_adapter;
pub mod vine_copula;
