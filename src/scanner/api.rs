//! Scan Engine API
//!
//! Public surface of the engine, consolidated so the CLI layer and
//! integration tests do not reach into individual modules.

// Scanner selection and invocation
pub use crate::scanner::backend::{classify_output, signature_name, CommandBackend, ScanBackend};
pub use crate::scanner::command::{
    ModePreference, Resolution, ScannerCommand, ScannerCommandResolver, ScannerMode,
};

// Run control
pub use crate::scanner::cancel::CancellationFlag;
pub use crate::scanner::dispatcher::{run_scan, BatchDispatcher};

// File discovery and infected file handling
pub use crate::scanner::disposition::InfectionHandler;
pub use crate::scanner::enumerate::{
    enumerate, Enumeration, EnumerationWarning, FileEnumerator, FileFilter,
};

// Signature database
pub use crate::scanner::updater::{DatabaseUpdater, UpdateOutcome, DEFAULT_UPDATER};

// Error handling
pub use crate::scanner::error::{EngineError, EngineResult};

// Core data types
pub use crate::scanner::types::{
    partition, Disposition, DispositionOutcome, FileFailure, FileList, InfectedRecord, ScanBatch,
    ScanConfiguration, ScanConfigurationBuilder, ScanFault, ScanResult, Verdict,
    DEFAULT_BATCH_SIZE, DEFAULT_SCAN_TIMEOUT,
};
