pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod sampling;
pub mod storage;
pub mod types;

// Layered boundaries: ports the pipeline depends on, adapters that implement them
pub mod app;
pub mod infra;
