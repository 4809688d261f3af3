//! Scan engine integration test modules

pub mod dispatch;
pub mod enumeration;
pub mod quarantine;
