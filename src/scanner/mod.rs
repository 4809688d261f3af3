//! Scan Engine
//!
//! Orchestrates a ClamAV sweep over a set of directory roots: resolve a usable
//! scanner front end, enumerate the files under the roots, scan them in
//! bounded parallel batches and act on every detection.
//!
//! ## Components
//!
//! - **ScannerCommandResolver**: picks `clamdscan` or `clamscan` for this host
//! - **FileEnumerator**: deterministic, exclusion-aware file walk
//! - **BatchDispatcher**: worker pool over fixed-size batches with progress and cancellation
//! - **InfectionHandler**: quarantine or delete with collision-safe naming
//! - **DatabaseUpdater**: advisory signature refresh before a run

pub mod api;
pub mod backend;
pub mod cancel;
pub mod command;
pub mod dispatcher;
pub mod disposition;
pub mod enumerate;
pub mod error;
pub mod types;
pub mod updater;

pub use error::{EngineError, EngineResult};
pub use types::{ScanConfiguration, ScanResult, Verdict};
