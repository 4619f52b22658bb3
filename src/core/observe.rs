// Injected decode tracing; decoders themselves hold no ambient state.
use crate::core::decode::{ColumnValue, DecodedColumn};
use crate::core::row::DecodedRow;
use crate::core::schema::ColumnDescriptor;

pub trait DecodeObserver {
    /// Called after each column decodes; `offset` is where its bytes began.
    fn column_decoded(&mut self, _row: u64, _offset: u64, _column: &DecodedColumn) {}

    fn row_decoded(&mut self, _row: &DecodedRow) {}

    fn table_finished(&mut self, _rows: u64) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl DecodeObserver for NoopObserver {}

impl<T: DecodeObserver + ?Sized> DecodeObserver for Box<T> {
    fn column_decoded(&mut self, row: u64, offset: u64, column: &DecodedColumn) {
        (**self).column_decoded(row, offset, column);
    }

    fn row_decoded(&mut self, row: &DecodedRow) {
        (**self).row_decoded(row);
    }

    fn table_finished(&mut self, rows: u64) {
        (**self).table_finished(rows);
    }
}

impl<T: DecodeObserver + ?Sized> DecodeObserver for &mut T {
    fn column_decoded(&mut self, row: u64, offset: u64, column: &DecodedColumn) {
        (**self).column_decoded(row, offset, column);
    }

    fn row_decoded(&mut self, row: &DecodedRow) {
        (**self).row_decoded(row);
    }

    fn table_finished(&mut self, rows: u64) {
        (**self).table_finished(rows);
    }
}

/// Emits one `trace` event per column and per row.
#[derive(Clone, Debug)]
pub struct TracingObserver {
    table: String,
}

impl TracingObserver {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl DecodeObserver for TracingObserver {
    fn column_decoded(&mut self, row: u64, offset: u64, column: &DecodedColumn) {
        let descriptor: &ColumnDescriptor = &column.column;
        let value = match &column.value {
            ColumnValue::Null => "NULL".to_string(),
            ColumnValue::Text(text) => format!("{text:?}"),
            ColumnValue::Binary { len } => format!("<{len} bytes>"),
        };
        tracing::trace!(
            table = %self.table,
            row,
            offset,
            column = %descriptor.name,
            sql_type = %descriptor.type_name,
            nullable = descriptor.nullable,
            is_null = column.is_null(),
            value = %value,
            "column decoded"
        );
    }

    fn row_decoded(&mut self, row: &DecodedRow) {
        tracing::trace!(
            table = %self.table,
            row = row.number,
            columns = row.columns.len(),
            "row decoded"
        );
    }

    fn table_finished(&mut self, rows: u64) {
        tracing::debug!(table = %self.table, rows, "end of table data");
    }
}
