//! RF2 release ingestion for snomed-graph (boundary adapter).
//!
//! SNOMED CT distributions ship as RF2: tab-delimited text files with a
//! header row, one file per component type. This crate sits at the interop
//! boundary:
//!
//! - It locates the three required snapshot files beneath an extracted
//!   release directory (`Snapshot`, falling back to `Full`).
//! - It streams them as typed rows with the `active` flag normalized to a
//!   real boolean exactly once, at the row level.
//! - It reports a pre-scanned total row count per file, used only to drive
//!   progress reporting.
//!
//! Discovery failures are fatal, user-facing preconditions: a missing
//! release subtree, a missing component file, and an ambiguous match are
//! three distinguishable errors, all raised before anything is written.

pub mod reader;
pub mod rows;

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub use reader::{count_data_rows, RowReader};
pub use rows::{ConceptRow, DescriptionRow, RelationshipRow};

/// The three RF2 component files a snapshot load requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rf2FileKind {
    Concept,
    Description,
    Relationship,
}

impl Rf2FileKind {
    /// File-name prefix the release convention guarantees, e.g.
    /// `sct2_Concept_Snapshot_INT_20240101.txt` for [`Rf2FileKind::Concept`].
    pub fn file_prefix(self) -> &'static str {
        match self {
            Rf2FileKind::Concept => "sct2_Concept",
            Rf2FileKind::Description => "sct2_Description",
            Rf2FileKind::Relationship => "sct2_Relationship",
        }
    }
}

impl fmt::Display for Rf2FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rf2FileKind::Concept => "concept",
            Rf2FileKind::Description => "description",
            Rf2FileKind::Relationship => "relationship",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Rf2Error {
    #[error("no `Snapshot` or `Full` directory found under {root}")]
    ReleaseDirMissing { root: PathBuf },

    #[error("no {kind} file matching `{prefix}*` found under {dir}")]
    FileMissing {
        kind: Rf2FileKind,
        prefix: &'static str,
        dir: PathBuf,
    },

    #[error("{count} {kind} files match `{prefix}*` under {dir}, expected exactly one")]
    FileAmbiguous {
        kind: Rf2FileKind,
        prefix: &'static str,
        dir: PathBuf,
        count: usize,
    },

    #[error("failed to read {file}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row that does not deserialize: missing column, short record, or an
    /// `active` flag that is neither `"0"` nor `"1"`.
    #[error("malformed row in {file}: {source}")]
    Malformed {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Paths of the three component files of one release, as discovered by
/// [`find_release_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFiles {
    pub concepts: PathBuf,
    pub descriptions: PathBuf,
    pub relationships: PathBuf,
}

impl ReleaseFiles {
    /// Lazy concept row stream. Re-opening the same file yields the same
    /// sequence; streams are restartable but not resumable mid-file.
    pub fn concept_rows(&self) -> Result<RowReader<ConceptRow>, Rf2Error> {
        reader::open(&self.concepts, true)
    }

    /// Lazy description row stream.
    ///
    /// Quoting is disabled for this file: description terms may contain
    /// literal quote characters, and interpreting them as field quoting
    /// mis-tokenizes the row.
    pub fn description_rows(&self) -> Result<RowReader<DescriptionRow>, Rf2Error> {
        reader::open(&self.descriptions, false)
    }

    /// Lazy relationship row stream. Inactive rows are *not* filtered here;
    /// that is the load pass's job.
    pub fn relationship_rows(&self) -> Result<RowReader<RelationshipRow>, Rf2Error> {
        reader::open(&self.relationships, true)
    }
}

/// Locate the three RF2 component files beneath `root`.
///
/// The release layout is: a directory literally named `Snapshot` (or `Full`
/// as a fallback) anywhere beneath `root`, containing exactly one file per
/// `sct2_Concept*` / `sct2_Description*` / `sct2_Relationship*` pattern.
pub fn find_release_files(root: &Path) -> Result<ReleaseFiles, Rf2Error> {
    let release_dir = find_release_dir(root)?;
    tracing::debug!(dir = %release_dir.display(), "release directory located");

    Ok(ReleaseFiles {
        concepts: find_unique_file(&release_dir, Rf2FileKind::Concept)?,
        descriptions: find_unique_file(&release_dir, Rf2FileKind::Description)?,
        relationships: find_unique_file(&release_dir, Rf2FileKind::Relationship)?,
    })
}

fn find_release_dir(root: &Path) -> Result<PathBuf, Rf2Error> {
    for name in ["Snapshot", "Full"] {
        let found = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .find(|entry| entry.file_type().is_dir() && entry.file_name() == name);
        if let Some(entry) = found {
            return Ok(entry.into_path());
        }
    }
    Err(Rf2Error::ReleaseDirMissing {
        root: root.to_path_buf(),
    })
}

fn find_unique_file(dir: &Path, kind: Rf2FileKind) -> Result<PathBuf, Rf2Error> {
    let prefix = kind.file_prefix();
    let mut matches: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy().starts_with(prefix)
        })
        .map(|entry| entry.into_path())
        .collect();

    match matches.len() {
        0 => Err(Rf2Error::FileMissing {
            kind,
            prefix,
            dir: dir.to_path_buf(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(Rf2Error::FileAmbiguous {
            kind,
            prefix,
            dir: dir.to_path_buf(),
            count,
        }),
    }
}
