//! Application module

pub mod cli;
pub mod progress;
pub mod report;
pub mod startup;
