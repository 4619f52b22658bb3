//! Typed column decoders for BCP native payloads.
//!
//! Every family implements [`Decode`]: it names its size-prefix layout,
//! optionally rejects impossible payload sizes, and turns the payload
//! bytes into a [`ColumnValue`]. [`ColumnDecoder`] is the closed dispatch
//! over the families, chosen once per column before any byte is read.
use std::io::Read;
use std::sync::Arc;

use crate::core::cursor::ByteCursor;
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::{ColumnDescriptor, TypeTag};
use crate::core::size;

mod numeric;
mod temporal;
mod text;

pub use numeric::{
    BitDecoder, DecimalDecoder, FloatDecoder, IntegerDecoder, MoneyDecoder, format_scaled,
};
pub use temporal::TemporalDecoder;
pub use text::{BinaryDecoder, GuidDecoder, NarrowTextDecoder, WideTextDecoder};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    /// Opaque payload; only its length is kept.
    Binary { len: usize },
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedColumn {
    pub column: Arc<ColumnDescriptor>,
    pub value: ColumnValue,
}

impl DecodedColumn {
    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn type_tag(&self) -> TypeTag {
        self.column.type_tag
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn text(&self) -> Option<&str> {
        self.value.as_text()
    }
}

/// Size-prefix shape of a column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    pub prefix_width: usize,
    /// Payload size of a NOT NULL value; `0` means the prefix is always read.
    pub fixed_size: usize,
}

impl Layout {
    pub const fn prefixed(prefix_width: usize) -> Self {
        Self {
            prefix_width,
            fixed_size: 0,
        }
    }

    pub const fn fixed(prefix_width: usize, fixed_size: usize) -> Self {
        Self {
            prefix_width,
            fixed_size,
        }
    }
}

pub trait Decode {
    fn layout(&self, column: &ColumnDescriptor) -> Layout;

    /// Rejects payload sizes the type can never have.
    fn check_size(&self, _column: &ColumnDescriptor, _byte_count: usize) -> Result<(), Error> {
        Ok(())
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error>;

    fn decode<R: Read>(
        &self,
        column: &ColumnDescriptor,
        cursor: &mut ByteCursor<R>,
    ) -> Result<ColumnValue, Error> {
        let layout = self.layout(column);
        let stored = size::resolve(cursor, column, layout.prefix_width, layout.fixed_size)?;
        if stored.is_null {
            return Ok(ColumnValue::Null);
        }
        self.check_size(column, stored.byte_count)?;
        let payload = cursor.read_exact(stored.byte_count)?;
        self.decode_payload(column, &payload)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnDecoder {
    Integer(IntegerDecoder),
    Bit(BitDecoder),
    Float(FloatDecoder),
    Decimal(DecimalDecoder),
    Money(MoneyDecoder),
    Temporal(TemporalDecoder),
    Guid(GuidDecoder),
    NarrowText(NarrowTextDecoder),
    WideText(WideTextDecoder),
    Binary(BinaryDecoder),
}

impl ColumnDecoder {
    pub fn for_column(column: &ColumnDescriptor) -> Result<Self, Error> {
        let decoder = match column.type_tag {
            TypeTag::TinyInt => ColumnDecoder::Integer(IntegerDecoder::TinyInt),
            TypeTag::SmallInt => ColumnDecoder::Integer(IntegerDecoder::SmallInt),
            TypeTag::Int => ColumnDecoder::Integer(IntegerDecoder::Int),
            TypeTag::BigInt => ColumnDecoder::Integer(IntegerDecoder::BigInt),
            TypeTag::Bit => ColumnDecoder::Bit(BitDecoder),
            TypeTag::Real => ColumnDecoder::Float(FloatDecoder::Real),
            TypeTag::Float => ColumnDecoder::Float(FloatDecoder::Float),
            TypeTag::Decimal | TypeTag::Numeric => ColumnDecoder::Decimal(DecimalDecoder),
            TypeTag::SmallMoney => ColumnDecoder::Money(MoneyDecoder::SmallMoney),
            TypeTag::Money => ColumnDecoder::Money(MoneyDecoder::Money),
            TypeTag::SmallDatetime => ColumnDecoder::Temporal(TemporalDecoder::SmallDatetime),
            TypeTag::Datetime => ColumnDecoder::Temporal(TemporalDecoder::Datetime),
            TypeTag::Date => ColumnDecoder::Temporal(TemporalDecoder::Date),
            TypeTag::Time => ColumnDecoder::Temporal(TemporalDecoder::Time),
            TypeTag::Datetime2 => ColumnDecoder::Temporal(TemporalDecoder::Datetime2),
            TypeTag::UniqueIdentifier => ColumnDecoder::Guid(GuidDecoder),
            TypeTag::Char | TypeTag::Varchar | TypeTag::Text => {
                ColumnDecoder::NarrowText(NarrowTextDecoder)
            }
            TypeTag::NChar | TypeTag::NVarchar | TypeTag::NText => {
                ColumnDecoder::WideText(WideTextDecoder)
            }
            TypeTag::Binary | TypeTag::Varbinary => ColumnDecoder::Binary(BinaryDecoder),
            TypeTag::Geography
            | TypeTag::Geometry
            | TypeTag::HierarchyId
            | TypeTag::Image
            | TypeTag::RowVersion
            | TypeTag::SqlVariant
            | TypeTag::Xml => {
                return Err(Error::new(ErrorKind::UnsupportedType)
                    .with_message(format!("no decoder for type {}", column.type_name))
                    .with_column(column.name.clone()));
            }
        };
        Ok(decoder)
    }

    pub fn decode<R: Read>(
        &self,
        column: &ColumnDescriptor,
        cursor: &mut ByteCursor<R>,
    ) -> Result<ColumnValue, Error> {
        match self {
            ColumnDecoder::Integer(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Bit(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Float(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Decimal(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Money(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Temporal(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Guid(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::NarrowText(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::WideText(decoder) => decoder.decode(column, cursor),
            ColumnDecoder::Binary(decoder) => decoder.decode(column, cursor),
        }
    }
}

pub(crate) fn malformed(
    column: &ColumnDescriptor,
    byte_count: usize,
    message: impl Into<String>,
) -> Error {
    Error::new(ErrorKind::MalformedColumn)
        .with_message(message)
        .with_column(column.name.clone())
        .with_byte_count(byte_count)
}

pub(crate) fn expect_width(
    column: &ColumnDescriptor,
    byte_count: usize,
    width: usize,
) -> Result<(), Error> {
    if byte_count != width {
        return Err(malformed(
            column,
            byte_count,
            format!("{} payload must be {width} bytes", column.type_tag),
        ));
    }
    Ok(())
}

pub(crate) fn le_array<const N: usize>(
    column: &ColumnDescriptor,
    payload: &[u8],
) -> Result<[u8; N], Error> {
    payload.try_into().map_err(|_| {
        malformed(
            column,
            payload.len(),
            format!("{} payload must be {N} bytes", column.type_tag),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{ColumnDecoder, ColumnValue, Decode, IntegerDecoder, NarrowTextDecoder};
    use crate::core::cursor::ByteCursor;
    use crate::core::error::ErrorKind;
    use crate::core::schema::{ColumnDescriptor, TypeTag};

    #[test]
    fn every_decodable_tag_has_a_decoder() {
        let decodable = [
            TypeTag::BigInt,
            TypeTag::Binary,
            TypeTag::Bit,
            TypeTag::Char,
            TypeTag::Date,
            TypeTag::Datetime,
            TypeTag::Datetime2,
            TypeTag::Decimal,
            TypeTag::Float,
            TypeTag::Int,
            TypeTag::Money,
            TypeTag::NChar,
            TypeTag::NText,
            TypeTag::Numeric,
            TypeTag::NVarchar,
            TypeTag::Real,
            TypeTag::SmallDatetime,
            TypeTag::SmallInt,
            TypeTag::SmallMoney,
            TypeTag::Text,
            TypeTag::Time,
            TypeTag::TinyInt,
            TypeTag::UniqueIdentifier,
            TypeTag::Varbinary,
            TypeTag::Varchar,
        ];
        for tag in decodable {
            let column = ColumnDescriptor::new("c", tag);
            ColumnDecoder::for_column(&column).expect("decoder");
        }
    }

    #[test]
    fn spatial_types_are_unsupported() {
        let column = ColumnDescriptor::new("shape", TypeTag::Geography);
        let err = ColumnDecoder::for_column(&column).expect_err("unsupported");
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        assert_eq!(err.column(), Some("shape"));
    }

    #[test]
    fn null_value_consumes_only_the_prefix() {
        let column = ColumnDescriptor::new("n", TypeTag::Int);
        let mut cursor = ByteCursor::new(&[0x00u8, 0x2A, 0, 0, 0][..]);
        let value = IntegerDecoder::Int.decode(&column, &mut cursor).expect("decode");
        assert_eq!(value, ColumnValue::Null);
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn wrong_fixed_width_is_rejected_before_payload_read() {
        let column = ColumnDescriptor::new("n", TypeTag::Int);
        let mut cursor = ByteCursor::new(&[0x03u8, 1, 2, 3][..]);
        let err = IntegerDecoder::Int.decode(&column, &mut cursor).expect_err("width");
        assert_eq!(err.kind(), ErrorKind::MalformedColumn);
        assert_eq!(err.byte_count(), Some(3));
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn not_null_empty_string_is_text() {
        let column = ColumnDescriptor::new("s", TypeTag::Varchar).not_null();
        let mut cursor = ByteCursor::new(&[0x00u8, 0x00][..]);
        let value = NarrowTextDecoder.decode(&column, &mut cursor).expect("decode");
        assert_eq!(value, ColumnValue::Text(String::new()));
    }
}
