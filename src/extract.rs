//! Purpose: Run table extraction over a bounded pool of worker threads.
//! Exports: `ExtractConfig`, `TableOutcome`, `extract_tables`.
//! Role: CLI driver between the model, the row reader, and the COPY writer.
//! Invariants: Each table is owned by one worker; rows decode strictly in order.
//! Invariants: A failed table keeps its earlier rows and a terminated COPY file.
//! Invariants: Outcomes are returned in the order tables were requested.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use bcp2pg::api::{
    DecodeObserver, Error, ErrorKind, NoopObserver, RowReader, TableDescriptor, TracingObserver,
    open_table,
};
use bcp2pg::copy_text::CopyWriter;

use crate::output_paths::{dump_path, ensure_output_dir, map_dump_name_error};

#[derive(Clone, Debug)]
pub(crate) struct ExtractConfig {
    pub output_dir: PathBuf,
    /// Row cap per table; `None` reads every row.
    pub limit: Option<u64>,
    pub workers: usize,
    pub debug: bool,
}

#[derive(Debug)]
pub(crate) struct TableOutcome {
    pub table: String,
    pub path: PathBuf,
    pub rows: u64,
    pub error: Option<Error>,
}

impl TableOutcome {
    pub fn status(&self) -> &'static str {
        if self.error.is_some() { "failed" } else { "ok" }
    }
}

type Job = (usize, Arc<TableDescriptor>);

pub(crate) fn extract_tables(
    tables: Vec<Arc<TableDescriptor>>,
    config: &ExtractConfig,
) -> Result<Vec<TableOutcome>, Error> {
    ensure_output_dir(&config.output_dir)?;
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    let job_count = tables.len();
    let (job_tx, job_rx) = mpsc::sync_channel::<Job>(job_count);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (done_tx, done_rx) = mpsc::channel::<(usize, TableOutcome)>();

    let mut handles = Vec::new();
    for worker in 0..config.workers.clamp(1, job_count) {
        let job_rx = Arc::clone(&job_rx);
        let done_tx = done_tx.clone();
        let config = config.clone();
        handles.push(std::thread::spawn(move || {
            loop {
                let job = match job_rx.lock() {
                    Ok(rx) => rx.recv(),
                    Err(_) => break,
                };
                let Ok((idx, table)) = job else {
                    break;
                };
                tracing::debug!(worker, table = %table.qualified_name(), "worker took table");
                if done_tx.send((idx, run_table(&table, &config))).is_err() {
                    break;
                }
            }
        }));
    }
    drop(done_tx);

    for job in tables.into_iter().enumerate() {
        job_tx.send(job).map_err(|_| {
            Error::new(ErrorKind::Internal).with_message("extract workers exited early")
        })?;
    }
    drop(job_tx);

    let mut slots: Vec<Option<TableOutcome>> = (0..job_count).map(|_| None).collect();
    for _ in 0..job_count {
        let (idx, outcome) = done_rx.recv().map_err(|_| {
            Error::new(ErrorKind::Internal).with_message("extract worker stopped before finishing")
        })?;
        slots[idx] = Some(outcome);
    }
    for handle in handles {
        let _ = handle.join();
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| {
                Error::new(ErrorKind::Internal).with_message("missing table outcome")
            })
        })
        .collect()
}

fn run_table(table: &Arc<TableDescriptor>, config: &ExtractConfig) -> TableOutcome {
    let name = table.qualified_name();
    let path = match dump_path(&config.output_dir, table) {
        Ok(path) => path,
        Err(err) => {
            let err = map_dump_name_error(err, table);
            tracing::error!(table = %name, kind = ?err.kind(), "table failed");
            return TableOutcome {
                table: name,
                path: PathBuf::new(),
                rows: 0,
                error: Some(err),
            };
        }
    };

    tracing::debug!(table = %name, path = %path.display(), "table started");
    let (rows, error) = if config.debug {
        write_table(table, &path, config.limit, TracingObserver::new(name.clone()))
    } else {
        write_table(table, &path, config.limit, NoopObserver)
    };

    let error = error.map(|err| {
        if err.table().is_none() {
            err.with_table(name.clone())
        } else {
            err
        }
    });
    match &error {
        None => tracing::info!(table = %name, rows, "table complete"),
        Some(err) => tracing::error!(
            table = %name,
            rows,
            row = ?err.row(),
            column = ?err.column(),
            kind = ?err.kind(),
            "table failed"
        ),
    }

    TableOutcome {
        table: name,
        path,
        rows,
        error,
    }
}

/// Returns rows written plus the first failure, if any. The COPY file is
/// terminated whenever its header was written.
fn write_table<O: DecodeObserver>(
    table: &Arc<TableDescriptor>,
    path: &Path,
    limit: Option<u64>,
    observer: O,
) -> (u64, Option<Error>) {
    let file = match File::create(path) {
        Ok(file) => file,
        Err(err) => {
            let err = Error::new(ErrorKind::Io)
                .with_message("failed to create dump file")
                .with_path(path)
                .with_source(err);
            return (0, Some(err));
        }
    };
    let mut writer = match CopyWriter::begin(BufWriter::new(file), table) {
        Ok(writer) => writer,
        Err(err) => return (0, Some(err.with_path(path))),
    };

    let failure = copy_rows(table, limit, observer, &mut writer).err();
    let rows = writer.rows_written();
    let finished = writer.finish().err().map(|err| err.with_path(path));
    (rows, failure.or(finished))
}

fn copy_rows<O: DecodeObserver>(
    table: &Arc<TableDescriptor>,
    limit: Option<u64>,
    observer: O,
    writer: &mut CopyWriter<BufWriter<File>>,
) -> Result<(), Error> {
    let source = open_table(table)?;
    let mut reader = RowReader::with_observer(Arc::clone(table), source, observer)?;
    while limit.is_none_or(|limit| writer.rows_written() < limit) {
        match reader.next_row()? {
            Some(row) => writer.write_row(&row)?,
            None => break,
        }
    }
    Ok(())
}
