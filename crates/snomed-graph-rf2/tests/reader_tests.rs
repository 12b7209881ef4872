use std::fs;
use std::path::{Path, PathBuf};

use snomed_graph_rf2::{count_data_rows, ReleaseFiles, Rf2Error};

const CONCEPT_HEADER: &str = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId";
const DESCRIPTION_HEADER: &str =
    "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId";
const RELATIONSHIP_HEADER: &str = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId";

fn write_file(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = String::from(header);
    for row in rows {
        contents.push('\n');
        contents.push_str(row);
    }
    contents.push('\n');
    fs::write(&path, contents).unwrap();
    path
}

fn release(dir: &Path, concepts: &[&str], descriptions: &[&str], relationships: &[&str]) -> ReleaseFiles {
    ReleaseFiles {
        concepts: write_file(dir, "sct2_Concept_Snapshot.txt", CONCEPT_HEADER, concepts),
        descriptions: write_file(
            dir,
            "sct2_Description_Snapshot.txt",
            DESCRIPTION_HEADER,
            descriptions,
        ),
        relationships: write_file(
            dir,
            "sct2_Relationship_Snapshot.txt",
            RELATIONSHIP_HEADER,
            relationships,
        ),
    }
}

#[test]
fn concept_rows_parse_with_normalized_active_flag() {
    let dir = tempfile::tempdir().unwrap();
    let files = release(
        dir.path(),
        &[
            "100\t20240101\t1\t900000000000207008\t900000000000074008",
            "200\t20240101\t0\t900000000000207008\t900000000000074008",
        ],
        &[],
        &[],
    );

    let rows: Vec<_> = files
        .concept_rows()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "100");
    assert!(rows[0].active);
    assert_eq!(rows[0].module_id, "900000000000207008");
    assert!(!rows[1].active);
}

#[test]
fn active_flag_other_than_zero_or_one_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let files = release(
        dir.path(),
        &["100\t20240101\t2\tm\td"],
        &[],
        &[],
    );

    let err = files
        .concept_rows()
        .unwrap()
        .next()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Rf2Error::Malformed { .. }), "{err}");
    assert!(err.to_string().contains("malformed row"));
}

#[test]
fn description_terms_keep_literal_quote_characters() {
    let dir = tempfile::tempdir().unwrap();
    let files = release(
        dir.path(),
        &[],
        &["300\t20240101\t1\tm\t100\ten\t900000000000003001\t\"Banana\" allergy (finding)\tcs"],
        &[],
    );

    let rows: Vec<_> = files
        .description_rows()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows[0].term, "\"Banana\" allergy (finding)");
    assert_eq!(rows[0].concept_id, "100");
    assert_eq!(rows[0].language_code, "en");
}

#[test]
fn relationship_rows_carry_all_edge_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let files = release(
        dir.path(),
        &[],
        &[],
        &["400\t20240101\t1\tm\t100\t200\t0\t116680003\tc\tmod"],
    );

    let rows: Vec<_> = files
        .relationship_rows()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows[0].source_id, "100");
    assert_eq!(rows[0].destination_id, "200");
    assert_eq!(rows[0].type_id, "116680003");
    assert_eq!(rows[0].characteristic_type_id, "c");
    assert_eq!(rows[0].modifier_id, "mod");
}

#[test]
fn row_streams_are_restartable() {
    let dir = tempfile::tempdir().unwrap();
    let files = release(dir.path(), &["100\t20240101\t1\tm\td"], &[], &[]);

    let first: Vec<_> = files
        .concept_rows()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let second: Vec<_> = files
        .concept_rows()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn pre_scan_counts_exclude_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let files = release(
        dir.path(),
        &[
            "100\t20240101\t1\tm\td",
            "200\t20240101\t1\tm\td",
            "300\t20240101\t0\tm\td",
        ],
        &[],
        &[],
    );

    assert_eq!(count_data_rows(&files.concepts).unwrap(), 3);
    assert_eq!(count_data_rows(&files.descriptions).unwrap(), 0);
}
