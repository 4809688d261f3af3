//! Common test utilities and helpers
//!
//! Fixture trees on disk plus a fake `clamscan` for tests that spawn a
//! real scanner process.

#![allow(dead_code)]

pub mod fake_scanner;
pub mod fixtures;
