//! Purpose: Output-directory and dump-file path helpers for `extract`.
//! Exports: `ensure_output_dir` and `dump_path`.
//! Role: Keep file naming for COPY dumps in one place.
//! Invariants: Dump files are named `<schema>.<name>.dump` inside the output directory.
//! Invariants: Table names must not contain path separators.

use std::path::{Path, PathBuf};

use bcp2pg::api::{Error, ErrorKind, TableDescriptor};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum DumpNameError {
    ContainsPathSeparator,
}

pub(crate) fn ensure_output_dir(dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to create output directory")
            .with_path(dir)
            .with_source(err)
    })
}

pub(crate) fn dump_path(output_dir: &Path, table: &TableDescriptor) -> Result<PathBuf, DumpNameError> {
    let name = table.qualified_name();
    if name.contains('/') || name.contains('\\') {
        return Err(DumpNameError::ContainsPathSeparator);
    }
    Ok(output_dir.join(format!("{name}.dump")))
}

pub(crate) fn map_dump_name_error(err: DumpNameError, table: &TableDescriptor) -> Error {
    match err {
        DumpNameError::ContainsPathSeparator => Error::new(ErrorKind::Usage)
            .with_message("table name contains a path separator")
            .with_table(table.qualified_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::{DumpNameError, dump_path};
    use bcp2pg::api::TableDescriptor;
    use std::path::Path;

    #[test]
    fn dump_files_use_qualified_names() {
        let table = TableDescriptor::new("dbo", "Orders");
        let path = dump_path(Path::new("/out"), &table).expect("path");
        assert_eq!(path, Path::new("/out/dbo.Orders.dump"));
    }

    #[test]
    fn separators_are_rejected() {
        let table = TableDescriptor::new("dbo", "../etc");
        assert_eq!(
            dump_path(Path::new("/out"), &table),
            Err(DumpNameError::ContainsPathSeparator)
        );
    }
}
