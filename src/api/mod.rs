//! Purpose: Define the public Rust API for decoding BCP native table dumps.
//! Exports: Model loading, data sources, the row reader, and decoder types.
//! Role: Public, additive-only surface used by the CLI and integration tests.
//! Invariants: Callers reach core types only through these re-exports.
//! Invariants: Decoding never writes output; rendering lives in `copy_text`.

mod model;
mod source;

pub use crate::core::cursor::{ByteCursor, ConcatSource};
pub use crate::core::decode::{
    ColumnDecoder, ColumnValue, Decode, DecodedColumn, Layout, format_scaled,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::observe::{DecodeObserver, NoopObserver, TracingObserver};
pub use crate::core::row::{DecodedRow, RowReader};
pub use crate::core::schema::{ColumnDescriptor, DEFAULT_TIME_SCALE, TableDescriptor, TypeTag};
pub use crate::core::size::{NULL_SENTINEL, StoredSize, interpret_prefix};
pub use model::Model;
pub use source::{data_files, open_table};
