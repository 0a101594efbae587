//! # caselink
//!
//! Command-line front end for `caselink-core`.
//!
//! - `cli` - argument parsing and command implementations
//! - `config` - TOML loading of analysis thresholds

pub mod cli;
pub mod config;
