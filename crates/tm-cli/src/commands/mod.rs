//! CLI subcommand implementations.

pub mod history;
pub mod records;
pub mod run;
pub mod today;
pub mod totals;
mod util;
