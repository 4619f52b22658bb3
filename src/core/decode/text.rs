// Character, binary and GUID payloads.
use crate::core::decode::{ColumnValue, Decode, Layout, expect_width, le_array, malformed};
use crate::core::error::Error;
use crate::core::schema::ColumnDescriptor;

const GUID_LEN: usize = 16;

/// `char`, `varchar`, `text`: one byte per character.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NarrowTextDecoder;

impl Decode for NarrowTextDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::prefixed(2)
    }

    fn decode_payload(
        &self,
        _column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        Ok(ColumnValue::Text(payload.iter().map(|&b| char::from(b)).collect()))
    }
}

/// `nchar`, `nvarchar`, `ntext`: UTF-16LE code units.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WideTextDecoder;

impl Decode for WideTextDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::prefixed(2)
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        if byte_count % 2 != 0 {
            return Err(malformed(
                column,
                byte_count,
                "odd byte count for double-byte text",
            ));
        }
        Ok(())
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        self.check_size(column, payload.len())?;
        let units = payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        let text = char::decode_utf16(units)
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        Ok(ColumnValue::Text(text))
    }
}

/// `binary`, `varbinary`: consumed but never rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BinaryDecoder;

impl Decode for BinaryDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::prefixed(2)
    }

    fn decode_payload(
        &self,
        _column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        Ok(ColumnValue::Binary { len: payload.len() })
    }
}

/// `uniqueidentifier`: first three groups little-endian, the rest in byte order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GuidDecoder;

impl Decode for GuidDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::fixed(1, GUID_LEN)
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        expect_width(column, byte_count, GUID_LEN)
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        let b: [u8; GUID_LEN] = le_array(column, payload)?;
        let data1 = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        let data2 = u16::from_le_bytes([b[4], b[5]]);
        let data3 = u16::from_le_bytes([b[6], b[7]]);
        let tail: String = b[10..].iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(ColumnValue::Text(format!(
            "{data1:08x}-{data2:04x}-{data3:04x}-{:02x}{:02x}-{tail}",
            b[8], b[9]
        )))
    }
}
