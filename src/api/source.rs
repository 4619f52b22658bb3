//! Purpose: Open a table's data files as one continuous byte stream.
//! Exports: `data_files`, `open_table`.
//! Role: Bridges the model's data directories to `ConcatSource`.
//! Invariants: Files are read in lexical filename order; non-files are skipped.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::core::cursor::ConcatSource;
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::TableDescriptor;

/// Regular files in `dir`, sorted by file name.
pub fn data_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        };
        Error::new(kind)
            .with_message("failed to read data directory")
            .with_path(dir)
            .with_source(err)
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read data directory entry")
                .with_path(dir)
                .with_source(err)
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Chains every data file of `table` into one reader.
pub fn open_table(table: &TableDescriptor) -> Result<ConcatSource, Error> {
    let mut source = ConcatSource::new();
    for path in data_files(&table.data_dir).map_err(|err| err.with_table(table.qualified_name()))? {
        let file = File::open(&path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to open data file")
                .with_table(table.qualified_name())
                .with_path(&path)
                .with_source(err)
        })?;
        tracing::debug!(table = %table.qualified_name(), file = %path.display(), "queued data file");
        source.push(BufReader::new(file));
    }
    Ok(source)
}
