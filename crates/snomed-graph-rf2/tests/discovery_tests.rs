use std::fs;
use std::path::Path;

use snomed_graph_rf2::{find_release_files, Rf2Error, Rf2FileKind};

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "id\n").unwrap();
}

fn complete_release(root: &Path) {
    let terminology = root.join("SnomedCT_Release/Snapshot/Terminology");
    touch(&terminology.join("sct2_Concept_Snapshot_INT_20240101.txt"));
    touch(&terminology.join("sct2_Description_Snapshot-en_INT_20240101.txt"));
    touch(&terminology.join("sct2_Relationship_Snapshot_INT_20240101.txt"));
}

#[test]
fn complete_tree_yields_exactly_one_path_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    complete_release(dir.path());

    let files = find_release_files(dir.path()).unwrap();
    assert!(files
        .concepts
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("sct2_Concept"));
    assert!(files
        .descriptions
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("sct2_Description"));
    assert!(files
        .relationships
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("sct2_Relationship"));
}

#[test]
fn missing_snapshot_dir_is_a_distinguishable_error() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("Terminology/sct2_Concept_Snapshot.txt"));

    let err = find_release_files(dir.path()).unwrap_err();
    assert!(matches!(err, Rf2Error::ReleaseDirMissing { .. }), "{err}");
}

#[test]
fn full_directory_is_accepted_as_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let terminology = dir.path().join("Full/Terminology");
    touch(&terminology.join("sct2_Concept_Full_INT.txt"));
    touch(&terminology.join("sct2_Description_Full_INT.txt"));
    touch(&terminology.join("sct2_Relationship_Full_INT.txt"));

    assert!(find_release_files(dir.path()).is_ok());
}

#[test]
fn missing_component_file_names_the_kind() {
    let dir = tempfile::tempdir().unwrap();
    let terminology = dir.path().join("Snapshot/Terminology");
    touch(&terminology.join("sct2_Concept_Snapshot.txt"));
    touch(&terminology.join("sct2_Description_Snapshot.txt"));

    let err = find_release_files(dir.path()).unwrap_err();
    match err {
        Rf2Error::FileMissing { kind, .. } => assert_eq!(kind, Rf2FileKind::Relationship),
        other => panic!("expected FileMissing, got {other}"),
    }
}

#[test]
fn ambiguous_match_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let terminology = dir.path().join("Snapshot/Terminology");
    touch(&terminology.join("sct2_Concept_Snapshot_A.txt"));
    touch(&terminology.join("sct2_Concept_Snapshot_B.txt"));
    touch(&terminology.join("sct2_Description_Snapshot.txt"));
    touch(&terminology.join("sct2_Relationship_Snapshot.txt"));

    let err = find_release_files(dir.path()).unwrap_err();
    match err {
        Rf2Error::FileAmbiguous { kind, count, .. } => {
            assert_eq!(kind, Rf2FileKind::Concept);
            assert_eq!(count, 2);
        }
        other => panic!("expected FileAmbiguous, got {other}"),
    }
}

#[test]
fn snapshot_is_preferred_over_full_when_both_exist() {
    let dir = tempfile::tempdir().unwrap();
    complete_release(dir.path());
    let full = dir.path().join("Full/Terminology");
    touch(&full.join("sct2_Concept_Full.txt"));
    touch(&full.join("sct2_Description_Full.txt"));
    touch(&full.join("sct2_Relationship_Full.txt"));

    let files = find_release_files(dir.path()).unwrap();
    assert!(files.concepts.to_string_lossy().contains("Snapshot"));
}
