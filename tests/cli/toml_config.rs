//! TOML configuration loading and precedence

use clamsweep::app::cli::args::Args;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("clamsweep.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_config_fills_unset_options() {
    let dir = TempDir::new().unwrap();
    let mut args = Args::new();
    args.config_file = Some(write_config(
        &dir,
        r#"
roots = ["/home", "/srv"]
batch-size = 100
jobs = 3
delete-infected = true
update-database = false
scanner-mode = "daemon"
"#,
    ));

    let load = args.load_config_file().await.unwrap();

    assert!(load.unknown_keys.is_empty());
    assert_eq!(args.roots, vec![PathBuf::from("/home"), PathBuf::from("/srv")]);
    assert_eq!(args.batch_size, Some(100));
    assert_eq!(args.jobs, Some(3));
    assert!(args.delete);
    assert!(args.no_update);
}

#[tokio::test]
async fn test_command_line_wins_over_config() {
    let dir = TempDir::new().unwrap();
    let mut args = Args::new();
    args.roots = vec![PathBuf::from("/data")];
    args.batch_size = Some(20);
    args.config_file = Some(write_config(&dir, "roots = [\"/home\"]\nbatch-size = 100\n"));

    args.load_config_file().await.unwrap();

    assert_eq!(args.roots, vec![PathBuf::from("/data")]);
    assert_eq!(args.batch_size, Some(20));
}

#[tokio::test]
async fn test_unknown_keys_are_reported() {
    let dir = TempDir::new().unwrap();
    let mut args = Args::new();
    args.config_file = Some(write_config(&dir, "jobs = 2\nturbo = true\n"));

    let load = args.load_config_file().await.unwrap();
    assert_eq!(load.unknown_keys, vec!["turbo".to_string()]);
}

#[tokio::test]
async fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut args = Args::new();
    args.config_file = Some(dir.path().join("absent.toml"));

    let err = args.load_config_file().await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn test_invalid_values_name_the_file() {
    let dir = TempDir::new().unwrap();
    let mut args = Args::new();
    let path = write_config(&dir, "batch-size = 0\n");
    args.config_file = Some(path.clone());

    let err = args.load_config_file().await.unwrap_err();
    assert!(err.to_string().contains(&path.display().to_string()));
}
