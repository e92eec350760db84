//! ATO: assemble-to-order capacity sizing
//!
//! Two-stage stochastic integer programs solved by sample average
//! approximation, with CLT-based in-sample and out-of-sample stability
//! analysis of the scenario count.

pub mod cli;
pub mod core;
pub mod logging;
