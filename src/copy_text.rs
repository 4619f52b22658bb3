//! Purpose: Render decoded rows as PostgreSQL `COPY ... FROM stdin` text.
//! Exports: `CopyWriter`, `copy_header`, `quote_identifier`, `escape_field`.
//! Role: Output format for `bcp2pg extract`; the decoder stays format-agnostic.
//! Invariants: NULL and binary values render as `\N`; other text is escaped.
//! Invariants: Every started file ends with the `\.` terminator and a blank line.
use std::io::Write;

use bstr::ByteSlice;

use crate::core::decode::ColumnValue;
use crate::core::error::{Error, ErrorKind};
use crate::core::row::DecodedRow;
use crate::core::schema::TableDescriptor;

pub const NULL_MARKER: &str = "\\N";
const TERMINATOR: &str = "\\.\n\n";
const SPECIAL: &[u8] = b"\x08\t\n\x0B\x0C\r\\";

pub struct CopyWriter<W: Write> {
    out: W,
    line: String,
    rows: u64,
}

impl<W: Write> CopyWriter<W> {
    /// Writes the `COPY` header and returns a writer positioned for rows.
    pub fn begin(mut out: W, table: &TableDescriptor) -> Result<Self, Error> {
        let header = copy_header(table);
        out.write_all(header.as_bytes())
            .and_then(|_| out.write_all(b"\n"))
            .map_err(write_error)?;
        Ok(Self {
            out,
            line: String::new(),
            rows: 0,
        })
    }

    pub fn write_row(&mut self, row: &DecodedRow) -> Result<(), Error> {
        self.line.clear();
        for (idx, column) in row.columns.iter().enumerate() {
            if idx > 0 {
                self.line.push('\t');
            }
            render_value(&column.value, &mut self.line);
        }
        self.line.push('\n');
        self.out
            .write_all(self.line.as_bytes())
            .map_err(write_error)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Writes the terminator, flushes, and hands back the sink.
    pub fn finish(mut self) -> Result<W, Error> {
        self.out
            .write_all(TERMINATOR.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(write_error)?;
        Ok(self.out)
    }
}

fn write_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write copy output")
        .with_source(err)
}

/// `COPY schema.name (col, ...) FROM stdin;`
pub fn copy_header(table: &TableDescriptor) -> String {
    let columns = table
        .columns
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "COPY {}.{} ({columns}) FROM stdin;",
        quote_identifier(&table.schema),
        quote_identifier(&table.name)
    )
}

/// Leaves plain lowercase identifiers bare and double-quotes the rest.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_lowercase() || first == '_')
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    };
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

pub fn render_value(value: &ColumnValue, out: &mut String) {
    match value {
        ColumnValue::Text(text) => escape_field(text, out),
        ColumnValue::Null | ColumnValue::Binary { .. } => out.push_str(NULL_MARKER),
    }
}

/// Appends `text` with COPY text-format escapes applied.
pub fn escape_field(text: &str, out: &mut String) {
    let mut rest = text;
    while let Some(idx) = rest.as_bytes().find_byteset(SPECIAL) {
        out.push_str(&rest[..idx]);
        out.push_str(match rest.as_bytes()[idx] {
            0x08 => "\\b",
            b'\t' => "\\t",
            b'\n' => "\\n",
            0x0B => "\\v",
            0x0C => "\\f",
            b'\r' => "\\r",
            _ => "\\\\",
        });
        rest = &rest[idx + 1..];
    }
    out.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::{CopyWriter, copy_header, escape_field, quote_identifier};
    use crate::core::decode::{ColumnValue, DecodedColumn};
    use crate::core::row::DecodedRow;
    use crate::core::schema::{ColumnDescriptor, TableDescriptor, TypeTag};
    use std::sync::Arc;

    fn escaped(text: &str) -> String {
        let mut out = String::new();
        escape_field(text, &mut out);
        out
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(escaped("plain"), "plain");
        assert_eq!(escaped("a\tb\nc\rd"), "a\\tb\\nc\\rd");
        assert_eq!(escaped("\u{8}\u{b}\u{c}"), "\\b\\v\\f");
        assert_eq!(escaped("C:\\temp"), "C:\\\\temp");
        assert_eq!(escaped("caf\u{e9}\n"), "caf\u{e9}\\n");
    }

    #[test]
    fn identifiers_quote_when_not_plain() {
        assert_eq!(quote_identifier("orders"), "orders");
        assert_eq!(quote_identifier("order_id2"), "order_id2");
        assert_eq!(quote_identifier("OrderId"), "\"OrderId\"");
        assert_eq!(quote_identifier("two words"), "\"two words\"");
        assert_eq!(quote_identifier("say\"hi"), "\"say\"\"hi\"");
        assert_eq!(quote_identifier("1st"), "\"1st\"");
    }

    #[test]
    fn writer_emits_header_rows_and_terminator() {
        let table = TableDescriptor::new("dbo", "Notes")
            .with_column(ColumnDescriptor::new("id", TypeTag::Int).not_null())
            .with_column(ColumnDescriptor::new("body", TypeTag::Varchar))
            .with_column(ColumnDescriptor::new("blob", TypeTag::Varbinary));
        assert_eq!(
            copy_header(&table),
            "COPY dbo.\"Notes\" (id, body, blob) FROM stdin;"
        );

        let row = DecodedRow {
            number: 1,
            columns: vec![
                DecodedColumn {
                    column: Arc::clone(&table.columns[0]),
                    value: ColumnValue::Text("7".to_string()),
                },
                DecodedColumn {
                    column: Arc::clone(&table.columns[1]),
                    value: ColumnValue::Text("two\tparts".to_string()),
                },
                DecodedColumn {
                    column: Arc::clone(&table.columns[2]),
                    value: ColumnValue::Binary { len: 3 },
                },
            ],
        };
        let null_row = DecodedRow {
            number: 2,
            columns: vec![
                DecodedColumn {
                    column: Arc::clone(&table.columns[0]),
                    value: ColumnValue::Text("8".to_string()),
                },
                DecodedColumn {
                    column: Arc::clone(&table.columns[1]),
                    value: ColumnValue::Null,
                },
                DecodedColumn {
                    column: Arc::clone(&table.columns[2]),
                    value: ColumnValue::Null,
                },
            ],
        };

        let mut writer = CopyWriter::begin(Vec::new(), &table).expect("begin");
        writer.write_row(&row).expect("row");
        writer.write_row(&null_row).expect("row");
        assert_eq!(writer.rows_written(), 2);
        let out = writer.finish().expect("finish");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "COPY dbo.\"Notes\" (id, body, blob) FROM stdin;\n\
             7\ttwo\\tparts\t\\N\n\
             8\t\\N\t\\N\n\
             \\.\n\n"
        );
    }

    #[test]
    fn empty_table_still_terminates() {
        let table = TableDescriptor::new("dbo", "empty")
            .with_column(ColumnDescriptor::new("id", TypeTag::Int));
        let writer = CopyWriter::begin(Vec::new(), &table).expect("begin");
        let out = writer.finish().expect("finish");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "COPY dbo.empty (id) FROM stdin;\n\\.\n\n"
        );
    }
}
