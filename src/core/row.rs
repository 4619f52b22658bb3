// Row assembly over a table's byte stream; clean end only at a row boundary.
use std::io::Read;
use std::sync::Arc;

use crate::core::cursor::ByteCursor;
use crate::core::decode::{ColumnDecoder, DecodedColumn};
use crate::core::error::{Error, ErrorKind};
use crate::core::observe::{DecodeObserver, NoopObserver};
use crate::core::schema::{ColumnDescriptor, TableDescriptor};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedRow {
    /// 1-based position of the row in the table stream.
    pub number: u64,
    pub columns: Vec<DecodedColumn>,
}

impl DecodedRow {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DecodedColumn> {
        self.columns.iter().find(|column| column.name() == name)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReadState {
    Reading,
    Done,
}

pub struct RowReader<R, O = NoopObserver> {
    table: Arc<TableDescriptor>,
    decoders: Vec<ColumnDecoder>,
    cursor: ByteCursor<R>,
    observer: O,
    state: ReadState,
    rows: u64,
}

impl<R: Read> RowReader<R, NoopObserver> {
    pub fn new(table: Arc<TableDescriptor>, source: R) -> Result<Self, Error> {
        Self::with_observer(table, source, NoopObserver)
    }
}

impl<R: Read, O: DecodeObserver> RowReader<R, O> {
    /// Resolves every column's decoder up front, so configuration errors
    /// surface before any byte is read.
    pub fn with_observer(
        table: Arc<TableDescriptor>,
        source: R,
        observer: O,
    ) -> Result<Self, Error> {
        if table.columns.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("table has no columns")
                .with_table(table.qualified_name()));
        }
        let decoders = table
            .columns
            .iter()
            .map(|column| ColumnDecoder::for_column(column))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.with_table(table.qualified_name()))?;

        Ok(Self {
            table,
            decoders,
            cursor: ByteCursor::new(source),
            observer,
            state: ReadState::Reading,
            rows: 0,
        })
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    pub fn is_done(&self) -> bool {
        self.state == ReadState::Done
    }

    /// Decodes the next row.
    ///
    /// `Ok(None)` means the stream ended cleanly on a row boundary, or that
    /// the reader already finished. Any error is fatal: the reader is done
    /// afterwards and the partial row is dropped.
    pub fn next_row(&mut self) -> Result<Option<DecodedRow>, Error> {
        if self.state == ReadState::Done {
            return Ok(None);
        }

        let row_start = self.cursor.offset();
        let number = self.cursor.row();
        let mut columns = Vec::with_capacity(self.decoders.len());
        for (column, decoder) in self.table.columns.iter().zip(&self.decoders) {
            let column_start = self.cursor.offset();
            let value = match decoder.decode(column, &mut self.cursor) {
                Ok(value) => value,
                Err(err) => {
                    self.state = ReadState::Done;
                    if err.kind() == ErrorKind::EndOfStream && self.cursor.offset() == row_start {
                        self.observer.table_finished(self.rows);
                        return Ok(None);
                    }
                    return Err(row_error(err, &self.table, number, column, column_start));
                }
            };
            let decoded = DecodedColumn {
                column: Arc::clone(column),
                value,
            };
            self.observer.column_decoded(number, column_start, &decoded);
            columns.push(decoded);
        }

        self.cursor.finish_row();
        self.rows += 1;
        let row = DecodedRow { number, columns };
        self.observer.row_decoded(&row);
        Ok(Some(row))
    }
}

impl<R: Read, O: DecodeObserver> Iterator for RowReader<R, O> {
    type Item = Result<DecodedRow, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

fn row_error(
    err: Error,
    table: &TableDescriptor,
    row: u64,
    column: &ColumnDescriptor,
    column_start: u64,
) -> Error {
    let mut err = if err.kind() == ErrorKind::EndOfStream {
        err.with_kind(ErrorKind::TruncatedRead)
            .with_message("stream ended inside a row")
    } else {
        err
    };
    if err.offset().is_none() {
        err = err.with_offset(column_start);
    }
    err.with_table(table.qualified_name())
        .with_row(row)
        .with_column(column.name.clone())
}
