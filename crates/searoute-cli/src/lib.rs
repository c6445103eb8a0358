//! Searoute CLI library.
//!
//! Command handlers, output formatting and logging setup for the `searoute`
//! binary.

pub mod commands;
pub mod logging;
pub mod output;
