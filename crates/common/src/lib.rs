//! Shared configuration for the aggregator API and CLI.

pub mod config;
pub mod tracing_init;

pub use config::Config;
pub use tracing_init::init_tracing;
