//! Core domain types and logic.

pub mod analysis;
pub mod cointegration;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod ordering;
pub mod rank;
pub mod returns;
pub mod selection;
pub mod series;
pub mod signal;
