//! Full runs through `app::startup::run` against a fake clamscan

#![cfg(unix)]

use crate::common::fake_scanner;
use crate::common::fixtures::{clean_tree, plant_infection};
use clamsweep::app::cli::args::Args;
use clamsweep::app::startup::{run, Environment, EXIT_CLEAN, EXIT_ERROR, EXIT_INFECTED};
use clamsweep::scanner::api::ScannerCommandResolver;
use serial_test::serial;
use std::path::Path;
use tempfile::TempDir;

struct Host {
    bin: TempDir,
    home: TempDir,
}

impl Host {
    fn with_clamscan() -> Self {
        let host = Self {
            bin: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
        };
        fake_scanner::install(host.bin.path(), "clamscan");
        host
    }

    fn environment(&self) -> Environment {
        Environment {
            resolver: ScannerCommandResolver::new()
                .with_search_path(self.bin.path())
                .with_daemon_probe(|| false),
            home: Some(self.home.path().to_path_buf()),
            cpus: 2,
            install_signal_handlers: false,
        }
    }

    /// Arguments isolated from the host: explicit empty config, no update, no log file
    fn args(&self, root: &Path) -> Args {
        let config = self.home.path().join("clamsweep.toml");
        std::fs::write(&config, "").unwrap();

        let mut args = Args::new();
        args.roots = vec![root.to_path_buf()];
        args.config_file = Some(config);
        args.no_update = true;
        args.no_log = true;
        args.no_default_excludes = true;
        args.no_color = true;
        args.batch_size = Some(2);
        args
    }
}

#[tokio::test]
#[serial]
async fn test_clean_tree_exits_zero() {
    let host = Host::with_clamscan();
    let tree = clean_tree(&["a.txt", "b/c.txt", "b/d.txt"]);

    let code = run(host.args(tree.path()), host.environment()).await;
    assert_eq!(code, EXIT_CLEAN);
}

#[tokio::test]
#[serial]
async fn test_infection_is_quarantined_under_home() {
    let host = Host::with_clamscan();
    let tree = clean_tree(&["a.txt", "b/c.txt"]);
    let infected = plant_infection(tree.path(), "b/eicar.com");

    let code = run(host.args(tree.path()), host.environment()).await;

    assert_eq!(code, EXIT_INFECTED);
    assert!(!infected.exists());
    assert!(host
        .home
        .path()
        .join("clamsweep/quarantine/eicar.com")
        .exists());
    assert!(tree.path().join("a.txt").exists());
}

#[tokio::test]
#[serial]
async fn test_delete_removes_infection() {
    let host = Host::with_clamscan();
    let tree = clean_tree(&["keep.txt"]);
    let infected = plant_infection(tree.path(), "bad.bin");
    let mut args = host.args(tree.path());
    args.delete = true;

    let code = run(args, host.environment()).await;

    assert_eq!(code, EXIT_INFECTED);
    assert!(!infected.exists());
    assert!(!host.home.path().join("clamsweep/quarantine").exists());
}

#[tokio::test]
#[serial]
async fn test_empty_tree_exits_zero() {
    let host = Host::with_clamscan();
    let tree = TempDir::new().unwrap();

    let code = run(host.args(tree.path()), host.environment()).await;
    assert_eq!(code, EXIT_CLEAN);
}

#[tokio::test]
#[serial]
async fn test_missing_scanner_exits_with_error() {
    let host = Host {
        bin: TempDir::new().unwrap(),
        home: TempDir::new().unwrap(),
    };
    let tree = clean_tree(&["a.txt"]);

    let code = run(host.args(tree.path()), host.environment()).await;
    assert_eq!(code, EXIT_ERROR);
}

#[tokio::test]
#[serial]
async fn test_missing_root_exits_with_error() {
    let host = Host::with_clamscan();
    let tree = TempDir::new().unwrap();

    let code = run(host.args(&tree.path().join("absent")), host.environment()).await;
    assert_eq!(code, EXIT_ERROR);
}

#[tokio::test]
#[serial]
async fn test_config_file_supplies_roots() {
    let host = Host::with_clamscan();
    let tree = clean_tree(&["x.txt"]);
    plant_infection(tree.path(), "y.txt");
    let config = host.home.path().join("roots.toml");
    std::fs::write(
        &config,
        format!(
            "roots = [\"{}\"]\ndelete-infected = true\nupdate-database = false\nlogging = false\ndefault-excludes = false\n",
            tree.path().display()
        ),
    )
    .unwrap();

    let mut args = Args::new();
    args.config_file = Some(config);
    let code = run(args, host.environment()).await;

    assert_eq!(code, EXIT_INFECTED);
    assert!(!tree.path().join("y.txt").exists());
}
