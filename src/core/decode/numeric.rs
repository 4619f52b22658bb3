// Integer, bit, float, decimal and money payloads.
use crate::core::decode::{ColumnValue, Decode, Layout, expect_width, le_array, malformed};
use crate::core::error::Error;
use crate::core::schema::ColumnDescriptor;
use crate::core::size::strip_trailing_zeros;

const DECIMAL_HEADER_LEN: usize = 3;
const DECIMAL_MAX_MAGNITUDE_LEN: usize = 16;
const DECIMAL_MAX_SCALE: usize = 38;
const MONEY_SCALE: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntegerDecoder {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
}

impl IntegerDecoder {
    pub fn width(self) -> usize {
        match self {
            IntegerDecoder::TinyInt => 1,
            IntegerDecoder::SmallInt => 2,
            IntegerDecoder::Int => 4,
            IntegerDecoder::BigInt => 8,
        }
    }
}

impl Decode for IntegerDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::fixed(1, self.width())
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        expect_width(column, byte_count, self.width())
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        let text = match self {
            IntegerDecoder::TinyInt => u8::from_le_bytes(le_array(column, payload)?).to_string(),
            IntegerDecoder::SmallInt => i16::from_le_bytes(le_array(column, payload)?).to_string(),
            IntegerDecoder::Int => i32::from_le_bytes(le_array(column, payload)?).to_string(),
            IntegerDecoder::BigInt => i64::from_le_bytes(le_array(column, payload)?).to_string(),
        };
        Ok(ColumnValue::Text(text))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BitDecoder;

impl Decode for BitDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::fixed(1, 1)
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        expect_width(column, byte_count, 1)
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        let [byte] = le_array::<1>(column, payload)?;
        let text = if byte != 0 { "1" } else { "0" };
        Ok(ColumnValue::Text(text.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FloatDecoder {
    Real,
    Float,
}

impl FloatDecoder {
    fn width(self) -> usize {
        match self {
            FloatDecoder::Real => 4,
            FloatDecoder::Float => 8,
        }
    }
}

impl Decode for FloatDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::fixed(1, self.width())
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        expect_width(column, byte_count, self.width())
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        let text = match self {
            FloatDecoder::Real => {
                let value = f32::from_le_bytes(le_array(column, payload)?);
                special_float(f64::from(value)).map_or_else(|| value.to_string(), str::to_string)
            }
            FloatDecoder::Float => {
                let value = f64::from_le_bytes(le_array(column, payload)?);
                special_float(value).map_or_else(|| value.to_string(), str::to_string)
            }
        };
        Ok(ColumnValue::Text(text))
    }
}

fn special_float(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("Infinity")
    } else if value == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}

/// `decimal` and `numeric`: `[precision][scale][sign][magnitude...]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecimalDecoder;

impl Decode for DecimalDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::prefixed(1)
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        if !(DECIMAL_HEADER_LEN..=DECIMAL_HEADER_LEN + DECIMAL_MAX_MAGNITUDE_LEN)
            .contains(&byte_count)
        {
            return Err(malformed(column, byte_count, "decimal payload size out of range"));
        }
        Ok(())
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        if payload.len() < DECIMAL_HEADER_LEN {
            return Err(malformed(column, payload.len(), "decimal payload too short"));
        }
        let scale = payload[1] as usize;
        if scale > DECIMAL_MAX_SCALE {
            return Err(malformed(
                column,
                payload.len(),
                format!("decimal scale {scale} exceeds {DECIMAL_MAX_SCALE}"),
            ));
        }
        let negative = payload[2] == 0x00;

        let magnitude = strip_trailing_zeros(&payload[DECIMAL_HEADER_LEN..]);
        if magnitude.len() > DECIMAL_MAX_MAGNITUDE_LEN {
            return Err(malformed(column, payload.len(), "decimal magnitude too wide"));
        }
        let value = magnitude
            .iter()
            .enumerate()
            .fold(0u128, |acc, (i, &b)| acc | ((b as u128) << (8 * i)));

        Ok(ColumnValue::Text(format_scaled(negative, value, scale)))
    }
}

/// Renders `magnitude / 10^scale` with exactly `scale` fraction digits.
///
/// The sign is prepended as given, so a negative zero keeps its `-`.
pub fn format_scaled(negative: bool, magnitude: u128, scale: usize) -> String {
    let mut digits = magnitude.to_string();
    if digits.len() <= scale {
        let pad = scale + 1 - digits.len();
        digits.insert_str(0, &"0".repeat(pad));
    }
    let split = digits.len() - scale;

    let mut out = String::with_capacity(digits.len() + 2);
    if negative {
        out.push('-');
    }
    out.push_str(&digits[..split]);
    if scale > 0 {
        out.push('.');
        out.push_str(&digits[split..]);
    }
    out
}

/// `smallmoney` (4 bytes) and `money` (8 bytes) as ten-thousandths.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MoneyDecoder {
    SmallMoney,
    Money,
}

impl MoneyDecoder {
    fn width(self) -> usize {
        match self {
            MoneyDecoder::SmallMoney => 4,
            MoneyDecoder::Money => 8,
        }
    }
}

impl Decode for MoneyDecoder {
    fn layout(&self, _column: &ColumnDescriptor) -> Layout {
        Layout::fixed(1, self.width())
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        expect_width(column, byte_count, self.width())
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        let units = match self {
            MoneyDecoder::SmallMoney => i64::from(i32::from_le_bytes(le_array(column, payload)?)),
            MoneyDecoder::Money => {
                let bytes: [u8; 8] = le_array(column, payload)?;
                let high = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let low = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
                (i64::from(high) << 32) | i64::from(low)
            }
        };
        let text = format_scaled(units < 0, u128::from(units.unsigned_abs()), MONEY_SCALE);
        Ok(ColumnValue::Text(text))
    }
}
