//! Infection handling against a real filesystem

use crate::common::fixtures::{clean_tree, plant_infection, write_file};
use clamsweep::scanner::api::{enumerate, Disposition, DispositionOutcome, InfectionHandler};
use std::fs;
use tempfile::TempDir;

const OUTPUT: &str = "Eicar-Test-Signature FOUND";

#[tokio::test]
async fn test_repeated_names_never_overwrite() {
    let tree = clean_tree(&[]);
    let vault = TempDir::new().unwrap();
    let handler = InfectionHandler::new(Disposition::Quarantine(vault.path().to_path_buf()));

    let mut destinations = Vec::new();
    for dir in ["a", "b", "c"] {
        let path = write_file(tree.path(), &format!("{dir}/invoice.pdf"), dir);
        let record = handler.dispose(&path, format!("{}: {}", path.display(), OUTPUT)).await;
        match record.disposition {
            DispositionOutcome::Quarantined { destination } => destinations.push(destination),
            other => panic!("expected quarantine, got {:?}", other),
        }
    }

    assert_eq!(
        destinations,
        vec![
            vault.path().join("invoice.pdf"),
            vault.path().join("invoice.1.pdf"),
            vault.path().join("invoice.2.pdf"),
        ]
    );
    assert_eq!(fs::read_to_string(vault.path().join("invoice.pdf")).unwrap(), "a");
    assert_eq!(fs::read_to_string(vault.path().join("invoice.2.pdf")).unwrap(), "c");
}

#[tokio::test]
async fn test_signature_is_extracted_from_output() {
    let tree = clean_tree(&[]);
    let path = plant_infection(tree.path(), "eicar.com");
    let handler = InfectionHandler::new(Disposition::Delete);

    let record = handler
        .dispose(&path, format!("{}: {}\n", path.display(), OUTPUT))
        .await;

    assert_eq!(record.signature.as_deref(), Some("Eicar-Test-Signature"));
    assert_eq!(record.disposition, DispositionOutcome::Deleted);
    assert!(!path.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unwritable_quarantine_leaves_file_in_place() {
    use std::os::unix::fs::PermissionsExt;

    let tree = clean_tree(&[]);
    let path = plant_infection(tree.path(), "stuck.exe");
    let vault = TempDir::new().unwrap();
    let locked = vault.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

    // root ignores directory permissions
    let writable = fs::write(locked.join("write-check"), b"x").is_ok();

    let handler = InfectionHandler::new(Disposition::Quarantine(locked.clone()));
    let record = handler.dispose(&path, OUTPUT.to_string()).await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();

    if !writable {
        assert!(record.disposition.is_failure());
        assert!(path.exists());
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_quarantine_through_symlink_moves_the_target() {
    let outside = TempDir::new().unwrap();
    let target = plant_infection(outside.path(), "evil.bin");
    let tree = clean_tree(&[]);
    let real = plant_infection(tree.path(), "real.bin");
    std::os::unix::fs::symlink(&target, tree.path().join("link.bin")).unwrap();
    std::os::unix::fs::symlink(&real, tree.path().join("alias.bin")).unwrap();
    let vault = TempDir::new().unwrap();
    let handler = InfectionHandler::new(Disposition::Quarantine(vault.path().to_path_buf()));

    let listed = enumerate(&[tree.path().to_path_buf()], &[]);
    assert_eq!(listed.files.len(), 2);

    for path in listed.files.iter() {
        let record = handler.dispose(path, format!("{}: {}", path.display(), OUTPUT)).await;
        assert!(
            matches!(record.disposition, DispositionOutcome::Quarantined { .. }),
            "{:?}",
            record
        );
    }

    assert!(!target.exists());
    assert!(!real.exists());
    let quarantined: Vec<_> = fs::read_dir(vault.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(quarantined.len(), 2);
    for path in &quarantined {
        let meta = fs::symlink_metadata(path).unwrap();
        assert!(meta.file_type().is_file(), "{} is not a regular file", path.display());
        assert!(fs::read_to_string(path).unwrap().contains("EICAR-TEST"));
    }
}
