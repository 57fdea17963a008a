pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod messaging;
pub mod metrics;
pub mod persistence;
pub mod sheet;
pub mod utils;
