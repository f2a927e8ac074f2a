//! Port traits for every external collaborator.

pub mod config_port;
pub mod data_port;
pub mod cointegration_port;
pub mod copula_port;
pub mod report_port;
