pub mod config;
pub mod domain;
pub mod metrics;
pub mod state_machine;
