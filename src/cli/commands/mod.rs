//! CLI command implementations

pub mod catalog;
pub mod completions;
pub mod init;
pub mod scenarios;
pub mod solve;
pub mod stability;
