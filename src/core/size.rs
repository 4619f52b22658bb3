// Stored-size prefix resolution: payload length plus the null/empty/sentinel rules.
use std::io::Read;

use crate::core::cursor::ByteCursor;
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::ColumnDescriptor;

/// Low-order prefix byte reserved to mark an explicit NULL.
pub const NULL_SENTINEL: u8 = 0xFF;

const MAX_PREFIX_WIDTH: usize = 8;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredSize {
    pub byte_count: usize,
    pub is_null: bool,
    /// Raw prefix bytes; empty when the fixed-size fast path was taken.
    pub prefix: Vec<u8>,
}

impl StoredSize {
    fn fixed(byte_count: usize) -> Self {
        Self {
            byte_count,
            is_null: false,
            prefix: Vec::new(),
        }
    }
}

pub fn resolve<R: Read>(
    cursor: &mut ByteCursor<R>,
    column: &ColumnDescriptor,
    prefix_width: usize,
    fixed_size: usize,
) -> Result<StoredSize, Error> {
    if !column.nullable && fixed_size > 0 {
        return Ok(StoredSize::fixed(fixed_size));
    }
    if prefix_width == 0 || prefix_width > MAX_PREFIX_WIDTH {
        return Err(Error::new(ErrorKind::Internal)
            .with_message(format!("unsupported size prefix width {prefix_width}"))
            .with_column(column.name.clone()));
    }

    let prefix = cursor.read_exact(prefix_width)?;
    Ok(interpret_prefix(prefix, column.nullable))
}

/// Applies the prefix rules to bytes already read.
///
/// Trailing zero bytes carry no magnitude. An empty remainder means no
/// payload, and so does a `0xFF` low-order byte. Either is NULL exactly
/// when the column is nullable.
pub fn interpret_prefix(prefix: Vec<u8>, nullable: bool) -> StoredSize {
    let significant = strip_trailing_zeros(&prefix);
    let no_payload = match significant.first() {
        None => true,
        Some(&low) => low == NULL_SENTINEL,
    };
    if no_payload {
        return StoredSize {
            byte_count: 0,
            is_null: nullable,
            prefix,
        };
    }

    let byte_count = significant
        .iter()
        .enumerate()
        .fold(0usize, |acc, (i, &b)| acc | ((b as usize) << (8 * i)));
    StoredSize {
        byte_count,
        is_null: false,
        prefix,
    }
}

pub fn strip_trailing_zeros(bytes: &[u8]) -> &[u8] {
    let len = bytes.iter().rposition(|&b| b != 0).map_or(0, |idx| idx + 1);
    &bytes[..len]
}
