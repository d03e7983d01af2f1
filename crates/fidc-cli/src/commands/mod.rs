//! CLI command implementations
//!
//! Each command group has its own module; functions take already-loaded
//! configuration and print their results to stdout.

pub mod config;
pub mod display;
pub mod imports;
