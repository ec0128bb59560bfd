//! Core domain types and logic.

pub mod backtest;
pub mod bar;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod resample;
pub mod session;
pub mod simulator;
pub mod stop_loss;
pub mod strategy;
pub mod trade;
