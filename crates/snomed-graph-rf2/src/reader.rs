//! Streaming row readers over tab-delimited RF2 files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::Rf2Error;

/// Lazy iterator of typed rows over one RF2 file.
///
/// Wraps a header-aware tab-delimited reader; each item is either a parsed
/// row or a [`Rf2Error::Malformed`] naming the offending file. The `csv`
/// reader buffers fields without a fixed size limit, so oversized
/// description terms stream through unharmed.
pub struct RowReader<T> {
    file: PathBuf,
    inner: csv::DeserializeRecordsIntoIter<File, T>,
}

impl<T: DeserializeOwned> Iterator for RowReader<T> {
    type Item = Result<T, Rf2Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.inner.next()?;
        Some(row.map_err(|source| Rf2Error::Malformed {
            file: self.file.clone(),
            source,
        }))
    }
}

/// Open a typed row stream over `path`.
///
/// `quoting` is disabled for description files (terms may contain literal
/// quote characters) and enabled for the other component files.
pub fn open<T: DeserializeOwned>(path: &Path, quoting: bool) -> Result<RowReader<T>, Rf2Error> {
    let file = File::open(path).map_err(|source| Rf2Error::Io {
        file: path.to_path_buf(),
        source,
    })?;

    let reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(quoting)
        .has_headers(true)
        .from_reader(file);

    Ok(RowReader {
        file: path.to_path_buf(),
        inner: reader.into_deserialize(),
    })
}

/// Count the data rows of an RF2 file (total lines minus the header).
///
/// This is a full pre-scan, independent of the row stream, and exists solely
/// to give progress reporting a denominator.
pub fn count_data_rows(path: &Path) -> Result<u64, Rf2Error> {
    let file = File::open(path).map_err(|source| Rf2Error::Io {
        file: path.to_path_buf(),
        source,
    })?;

    let mut lines = 0u64;
    for line in BufReader::new(file).lines() {
        line.map_err(|source| Rf2Error::Io {
            file: path.to_path_buf(),
            source,
        })?;
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}
