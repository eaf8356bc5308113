//! CLI command implementations

pub mod apply;
pub mod chain;
pub mod completions;
pub mod config;
pub mod matching;
pub mod run;
pub mod store;
