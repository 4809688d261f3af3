//! Batch dispatch through the public API with an in-process backend

use async_trait::async_trait;
use clamsweep::scanner::api::{
    BatchDispatcher, CancellationFlag, Disposition, DispositionOutcome, EngineError, FileList,
    ScanBackend, ScanConfiguration, ScanFault, Verdict,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

use crate::common::fixtures::{clean_tree, plant_infection};

/// Flags files by name suffix and counts scans
#[derive(Default)]
struct SuffixBackend {
    infected_suffix: Option<&'static str>,
    unreadable_suffix: Option<&'static str>,
    daemon_gone: bool,
    scans: AtomicUsize,
}

#[async_trait]
impl ScanBackend for SuffixBackend {
    async fn scan_file(&self, path: &Path) -> Verdict {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let name = path.to_string_lossy();
        if self.daemon_gone {
            return Verdict::scan_error("Could not connect to clamd", ScanFault::Scanner);
        }
        if self.infected_suffix.is_some_and(|s| name.ends_with(s)) {
            return Verdict::Infected {
                details: format!("{}: Win.Test.EICAR_HDB-1 FOUND", name),
            };
        }
        if self.unreadable_suffix.is_some_and(|s| name.ends_with(s)) {
            return Verdict::scan_error("Permission denied", ScanFault::Input);
        }
        Verdict::Clean
    }
}

fn config(batch_size: usize, workers: usize, disposition: Disposition) -> ScanConfiguration {
    ScanConfiguration::builder()
        .batch_size(batch_size)
        .worker_concurrency(workers)
        .disposition(disposition)
        .logging_enabled(false)
        .build()
        .unwrap()
}

fn virtual_files(n: usize) -> FileList {
    FileList::new((0..n).map(|i| PathBuf::from(format!("/srv/share/file{i:05}.dat"))).collect())
}

#[tokio::test]
async fn test_every_file_is_scanned_exactly_once() {
    let backend = Arc::new(SuffixBackend::default());
    let dispatcher = BatchDispatcher::new(config(7, 3, Disposition::Delete), backend.clone());
    let mut reported = 0;

    let result = dispatcher
        .run(virtual_files(100), |n| reported += n, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(backend.scans.load(Ordering::SeqCst), 100);
    assert_eq!(result.total_files, 100);
    assert_eq!(result.enumerated, 100);
    assert_eq!(reported, 100);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_quarantine_through_dispatcher() {
    let tree = clean_tree(&["ok-1.txt", "ok-2.txt"]);
    let bad = plant_infection(tree.path(), "payload.bad");
    let vault = TempDir::new().unwrap();
    let quarantine = vault.path().join("quarantine");

    let files = FileList::new(vec![
        tree.path().join("ok-1.txt"),
        bad.clone(),
        tree.path().join("ok-2.txt"),
    ]);
    let backend = Arc::new(SuffixBackend {
        infected_suffix: Some(".bad"),
        ..Default::default()
    });
    let dispatcher = BatchDispatcher::new(
        config(1, 2, Disposition::Quarantine(quarantine.clone())),
        backend,
    );

    let result = dispatcher
        .run(files, |_| {}, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(result.infected.len(), 1);
    let record = &result.infected[0];
    assert_eq!(record.path, bad);
    assert_eq!(record.signature.as_deref(), Some("Win.Test.EICAR_HDB-1"));
    assert_eq!(
        record.disposition,
        DispositionOutcome::Quarantined {
            destination: quarantine.join("payload.bad")
        }
    );
    assert!(!bad.exists());
    assert!(quarantine.join("payload.bad").exists());
    assert_eq!(result.processed, 3);
}

#[tokio::test]
async fn test_unreadable_files_are_reported_not_fatal() {
    let backend = Arc::new(SuffixBackend {
        unreadable_suffix: Some("3.dat"),
        ..Default::default()
    });
    let dispatcher = BatchDispatcher::new(config(10, 2, Disposition::Delete), backend);

    let result = dispatcher
        .run(virtual_files(40), |_| {}, &CancellationFlag::new())
        .await
        .unwrap();

    // file00003, 00013, 00023, 00033
    assert_eq!(result.errors.len(), 4);
    assert!(result.errors.iter().all(|e| e.fault == ScanFault::Input));
    assert_eq!(result.processed, 36);
    assert_eq!(result.total_files, 40);
}

#[tokio::test]
async fn test_lost_daemon_fails_the_pool_with_partial_result() {
    let backend = Arc::new(SuffixBackend {
        daemon_gone: true,
        ..Default::default()
    });
    let dispatcher = BatchDispatcher::new(config(5, 1, Disposition::Delete), backend);

    let err = dispatcher
        .run(virtual_files(50), |_| {}, &CancellationFlag::new())
        .await
        .unwrap_err();

    match &err {
        EngineError::PoolFailure { partial, .. } => {
            assert!(partial.total_files < 50);
            assert!(partial.errors.iter().all(|e| e.fault == ScanFault::Scanner));
        }
        other => panic!("expected pool failure, got {:?}", other),
    }
    assert!(err.partial_result().is_some());
}

#[tokio::test]
async fn test_cancel_before_run_scans_nothing() {
    let backend = Arc::new(SuffixBackend::default());
    let dispatcher = BatchDispatcher::new(config(5, 2, Disposition::Delete), backend.clone());
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let result = dispatcher
        .run(virtual_files(20), |_| {}, &cancel)
        .await
        .unwrap();

    assert_eq!(backend.scans.load(Ordering::SeqCst), 0);
    assert_eq!(result.total_files, 0);
    assert!(result.cancelled);
}

#[tokio::test]
async fn test_infected_paths_are_distinct() {
    let backend = Arc::new(SuffixBackend {
        infected_suffix: Some("7.dat"),
        ..Default::default()
    });
    let tmp = TempDir::new().unwrap();
    // Files do not exist, so deletion fails but detections are still reported
    let dispatcher = BatchDispatcher::new(config(4, 4, Disposition::Delete), backend);
    let files = FileList::new(
        (0..30)
            .map(|i| tmp.path().join(format!("f{i:02}7.dat")))
            .collect(),
    );

    let result = dispatcher
        .run(files, |_| {}, &CancellationFlag::new())
        .await
        .unwrap();

    let distinct: HashSet<_> = result.infected.iter().map(|r| r.path.clone()).collect();
    assert_eq!(distinct.len(), 30);
    assert!(result.infected.iter().all(|r| r.disposition.is_failure()));
}

/// Holds the named files until the gate opens; everything else is clean at once
struct GatedBackend {
    held: HashSet<PathBuf>,
    gate: watch::Receiver<bool>,
    parked: AtomicUsize,
    scanned: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ScanBackend for GatedBackend {
    async fn scan_file(&self, path: &Path) -> Verdict {
        self.scanned.lock().unwrap().push(path.to_path_buf());
        if self.held.contains(path) {
            self.parked.fetch_add(1, Ordering::SeqCst);
            let mut gate = self.gate.clone();
            let _ = gate.wait_for(|open| *open).await;
        }
        Verdict::Clean
    }
}

#[tokio::test]
async fn test_cancel_after_two_batches_drains_the_three_in_flight() {
    // 6 batches of one file on 3 workers: batches 0 and 1 finish, 2..=4 are held
    let files = virtual_files(6);
    let (open_gate, gate) = watch::channel(false);
    let backend = Arc::new(GatedBackend {
        held: files.as_slice()[2..5].iter().cloned().collect(),
        gate,
        parked: AtomicUsize::new(0),
        scanned: Mutex::new(Vec::new()),
    });
    let dispatcher = BatchDispatcher::new(config(1, 3, Disposition::Delete), backend.clone());
    let cancel = CancellationFlag::new();
    let mut progress = Vec::new();

    let control = async {
        tokio::time::timeout(Duration::from_secs(5), async {
            while backend.parked.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("three batches should be in flight");
        cancel.cancel();
        open_gate.send(true).unwrap();
    };
    let (result, ()) = tokio::join!(
        dispatcher.run(files.clone(), |n| progress.push(n), &cancel),
        control
    );

    let result = result.unwrap();
    assert_eq!(result.total_files, 5);
    assert_eq!(progress, vec![1, 1, 1, 1, 1]);
    assert!(result.cancelled);
    let scanned = backend.scanned.lock().unwrap();
    assert_eq!(scanned.len(), 5);
    assert!(!scanned.contains(&files.as_slice()[5]));
}
