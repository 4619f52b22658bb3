// Calendar decoding for the date and time families.
use time::{Date, Duration, Month};

use crate::core::decode::{ColumnValue, Decode, Layout, expect_width, le_array, malformed};
use crate::core::error::Error;
use crate::core::schema::ColumnDescriptor;

const DATE_LEN: usize = 3;
const MAX_TIME_SCALE: u8 = 7;
const SECONDS_PER_DAY: u64 = 86_400;
const MINUTES_PER_DAY: u16 = 1_440;
/// `datetime` counts 1/300 second ticks.
const DATETIME_TICKS_PER_DAY: u32 = 86_400 * 300;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TemporalDecoder {
    SmallDatetime,
    Datetime,
    Date,
    Time,
    Datetime2,
}

/// Bytes used by the time part at the given fractional-seconds scale.
pub fn time_width(scale: u8) -> usize {
    match scale {
        0..=2 => 3,
        3..=4 => 4,
        _ => 5,
    }
}

impl Decode for TemporalDecoder {
    fn layout(&self, column: &ColumnDescriptor) -> Layout {
        let fixed = match self {
            TemporalDecoder::SmallDatetime => 4,
            TemporalDecoder::Datetime => 8,
            TemporalDecoder::Date => DATE_LEN,
            TemporalDecoder::Time => time_width(column.scale),
            TemporalDecoder::Datetime2 => time_width(column.scale) + DATE_LEN,
        };
        Layout::fixed(1, fixed)
    }

    fn check_size(&self, column: &ColumnDescriptor, byte_count: usize) -> Result<(), Error> {
        match self {
            TemporalDecoder::SmallDatetime => expect_width(column, byte_count, 4),
            TemporalDecoder::Datetime => expect_width(column, byte_count, 8),
            TemporalDecoder::Date => expect_width(column, byte_count, DATE_LEN),
            TemporalDecoder::Time => expect_width(column, byte_count, time_width(column.scale)),
            TemporalDecoder::Datetime2 => {
                expect_width(column, byte_count, time_width(column.scale) + DATE_LEN)
            }
        }
    }

    fn decode_payload(
        &self,
        column: &ColumnDescriptor,
        payload: &[u8],
    ) -> Result<ColumnValue, Error> {
        let text = match self {
            TemporalDecoder::SmallDatetime => {
                let bytes: [u8; 4] = le_array(column, payload)?;
                let days = u16::from_le_bytes([bytes[0], bytes[1]]);
                let minutes = u16::from_le_bytes([bytes[2], bytes[3]]);
                if minutes >= MINUTES_PER_DAY {
                    return Err(malformed(column, payload.len(), "smalldatetime minutes out of range"));
                }
                let date = days_since(column, payload.len(), 1900, i64::from(days))?;
                format!(
                    "{} {:02}:{:02}:00",
                    format_date(date),
                    minutes / 60,
                    minutes % 60
                )
            }
            TemporalDecoder::Datetime => {
                let bytes: [u8; 8] = le_array(column, payload)?;
                let days = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let ticks = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
                if ticks >= DATETIME_TICKS_PER_DAY {
                    return Err(malformed(column, payload.len(), "datetime ticks out of range"));
                }
                let date = days_since(column, payload.len(), 1900, i64::from(days))?;
                let millis = (u64::from(ticks) * 10 + 1) / 3;
                let secs = millis / 1000;
                format!(
                    "{} {:02}:{:02}:{:02}.{:03}",
                    format_date(date),
                    secs / 3600,
                    secs / 60 % 60,
                    secs % 60,
                    millis % 1000
                )
            }
            TemporalDecoder::Date => {
                let date = decode_date(column, payload)?;
                format_date(date)
            }
            TemporalDecoder::Time => decode_time(column, payload)?,
            TemporalDecoder::Datetime2 => {
                if payload.len() <= DATE_LEN {
                    return Err(malformed(column, payload.len(), "datetime2 payload too short"));
                }
                let (time_part, date_part) = payload.split_at(payload.len() - DATE_LEN);
                let time = decode_time(column, time_part)?;
                let date = decode_date(column, date_part)?;
                format!("{} {time}", format_date(date))
            }
        };
        Ok(ColumnValue::Text(text))
    }
}

fn days_since(
    column: &ColumnDescriptor,
    byte_count: usize,
    epoch_year: i32,
    days: i64,
) -> Result<Date, Error> {
    Date::from_calendar_date(epoch_year, Month::January, 1)
        .ok()
        .and_then(|epoch| epoch.checked_add(Duration::days(days)))
        .ok_or_else(|| malformed(column, byte_count, "date out of range"))
}

fn decode_date(column: &ColumnDescriptor, payload: &[u8]) -> Result<Date, Error> {
    let bytes: [u8; DATE_LEN] = le_array(column, payload)?;
    let days = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    days_since(column, payload.len(), 1, i64::from(days))
}

/// `HH:MM:SS` plus exactly `scale` fraction digits.
fn decode_time(column: &ColumnDescriptor, payload: &[u8]) -> Result<String, Error> {
    if column.scale > MAX_TIME_SCALE {
        return Err(malformed(
            column,
            payload.len(),
            format!("time scale {} exceeds {MAX_TIME_SCALE}", column.scale),
        ));
    }
    if payload.len() > 8 {
        return Err(malformed(column, payload.len(), "time payload too wide"));
    }
    let units = payload
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)));

    let scale = usize::from(column.scale);
    let per_second = 10u64.pow(u32::from(column.scale));
    let secs = units / per_second;
    if secs >= SECONDS_PER_DAY {
        return Err(malformed(column, payload.len(), "time of day out of range"));
    }

    let mut out = format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
    if scale > 0 {
        out.push_str(&format!(".{:0scale$}", units % per_second));
    }
    Ok(out)
}

fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use super::{TemporalDecoder, time_width};
    use crate::core::cursor::ByteCursor;
    use crate::core::decode::{ColumnValue, Decode};
    use crate::core::error::ErrorKind;
    use crate::core::schema::{ColumnDescriptor, TypeTag};

    fn decode(decoder: TemporalDecoder, column: &ColumnDescriptor, payload: &[u8]) -> String {
        match decoder.decode_payload(column, payload).expect("decode") {
            ColumnValue::Text(text) => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    fn date_bytes(days: u32) -> [u8; 3] {
        let b = days.to_le_bytes();
        [b[0], b[1], b[2]]
    }

    #[test]
    fn datetime_rounds_ticks_to_milliseconds() {
        let column = ColumnDescriptor::new("at", TypeTag::Datetime);
        let mut payload = 0i32.to_le_bytes().to_vec();
        payload.extend_from_slice(&1u32.to_le_bytes());
        assert_eq!(
            decode(TemporalDecoder::Datetime, &column, &payload),
            "1900-01-01 00:00:00.003"
        );

        // 2000-01-01 is 36524 days after 1900-01-01; 12:30:15.5 is 13_504_650 ticks.
        let mut payload = 36_524i32.to_le_bytes().to_vec();
        payload.extend_from_slice(&13_504_650u32.to_le_bytes());
        assert_eq!(
            decode(TemporalDecoder::Datetime, &column, &payload),
            "2000-01-01 12:30:15.500"
        );
    }

    #[test]
    fn datetime_before_epoch() {
        let column = ColumnDescriptor::new("at", TypeTag::Datetime);
        let mut payload = (-1i32).to_le_bytes().to_vec();
        payload.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(
            decode(TemporalDecoder::Datetime, &column, &payload),
            "1899-12-31 00:00:00.000"
        );
    }

    #[test]
    fn datetime_rejects_ticks_past_midnight() {
        let column = ColumnDescriptor::new("at", TypeTag::Datetime);
        let mut payload = 0i32.to_le_bytes().to_vec();
        payload.extend_from_slice(&(86_400u32 * 300).to_le_bytes());
        let err = TemporalDecoder::Datetime
            .decode_payload(&column, &payload)
            .expect_err("range");
        assert_eq!(err.kind(), ErrorKind::MalformedColumn);
    }

    #[test]
    fn smalldatetime_has_minute_precision() {
        let column = ColumnDescriptor::new("at", TypeTag::SmallDatetime);
        let mut payload = 31u16.to_le_bytes().to_vec();
        payload.extend_from_slice(&(9u16 * 60 + 5).to_le_bytes());
        assert_eq!(
            decode(TemporalDecoder::SmallDatetime, &column, &payload),
            "1900-02-01 09:05:00"
        );
    }

    #[test]
    fn date_counts_from_year_one() {
        let column = ColumnDescriptor::new("d", TypeTag::Date);
        assert_eq!(
            decode(TemporalDecoder::Date, &column, &date_bytes(0)),
            "0001-01-01"
        );
        // 730119 days after 0001-01-01 is 2000-01-01.
        assert_eq!(
            decode(TemporalDecoder::Date, &column, &date_bytes(730_119)),
            "2000-01-01"
        );
    }

    #[test]
    fn time_prints_scale_digits() {
        let column = ColumnDescriptor::new("t", TypeTag::Time).with_scale(3);
        let units: u64 = (13 * 3600 + 14 * 60 + 15) * 1000 + 16;
        let payload = &units.to_le_bytes()[..time_width(3)];
        assert_eq!(
            decode(TemporalDecoder::Time, &column, payload),
            "13:14:15.016"
        );

        let column = ColumnDescriptor::new("t", TypeTag::Time).with_scale(0);
        let payload = &59u64.to_le_bytes()[..time_width(0)];
        assert_eq!(decode(TemporalDecoder::Time, &column, payload), "00:00:59");
    }

    #[test]
    fn datetime2_splits_time_and_date() {
        let column = ColumnDescriptor::new("at", TypeTag::Datetime2);
        let units: u64 = (23 * 3600 + 59 * 60 + 59) * 10_000_000 + 1_234_567;
        let mut payload = units.to_le_bytes()[..5].to_vec();
        payload.extend_from_slice(&date_bytes(730_119));
        assert_eq!(
            decode(TemporalDecoder::Datetime2, &column, &payload),
            "2000-01-01 23:59:59.1234567"
        );
    }

    #[test]
    fn datetime2_not_null_uses_scale_width() {
        let column = ColumnDescriptor::new("at", TypeTag::Datetime2)
            .with_scale(2)
            .not_null();
        let mut bytes = vec![0x64u8, 0x00, 0x00];
        bytes.extend_from_slice(&date_bytes(0));
        let mut cursor = ByteCursor::new(&bytes[..]);
        let value = TemporalDecoder::Datetime2
            .decode(&column, &mut cursor)
            .expect("decode");
        assert_eq!(value, ColumnValue::Text("0001-01-01 00:00:01.00".to_string()));
        assert_eq!(cursor.offset(), 6);
    }

    #[test]
    fn time_width_must_match_declared_scale() {
        let column = ColumnDescriptor::new("t", TypeTag::Time);
        let mut cursor = ByteCursor::new(&[0x03u8, 0x10, 0x27, 0x00][..]);
        let err = TemporalDecoder::Time
            .decode(&column, &mut cursor)
            .expect_err("width");
        assert_eq!(err.kind(), ErrorKind::MalformedColumn);
        assert_eq!(err.byte_count(), Some(3));
    }

    #[test]
    fn datetime2_width_must_match_declared_scale() {
        let column = ColumnDescriptor::new("at", TypeTag::Datetime2).with_scale(0);
        let mut bytes = vec![0x08u8, 0x01, 0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&date_bytes(0));
        let mut cursor = ByteCursor::new(&bytes[..]);
        let err = TemporalDecoder::Datetime2
            .decode(&column, &mut cursor)
            .expect_err("width");
        assert_eq!(err.kind(), ErrorKind::MalformedColumn);
        assert_eq!(err.byte_count(), Some(8));

        let mut bytes = vec![0x06u8, 0x01, 0x00, 0x00];
        bytes.extend_from_slice(&date_bytes(0));
        let mut cursor = ByteCursor::new(&bytes[..]);
        let value = TemporalDecoder::Datetime2
            .decode(&column, &mut cursor)
            .expect("decode");
        assert_eq!(value, ColumnValue::Text("0001-01-01 00:00:01".to_string()));
    }

    #[test]
    fn time_widths_follow_scale() {
        assert_eq!(time_width(0), 3);
        assert_eq!(time_width(2), 3);
        assert_eq!(time_width(3), 4);
        assert_eq!(time_width(4), 4);
        assert_eq!(time_width(7), 5);
    }
}
