//! Pointer activity tracker CLI library.
//!
//! This crate provides the `tm` command-line interface: configuration
//! loading, the tracking loop and the read-only reports.

mod cli;
pub mod commands;
mod config;
pub mod units;

pub use cli::{Cli, Commands};
pub use config::{Config, DistanceUnit};
