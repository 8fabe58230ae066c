//! Separator-delimited textual row codec.

use std::io::Write;

use chrono::{DateTime, Duration, Utc};

use crate::layout::{format_timespan, DataType, Row, RowLayout, Value};

use super::error::CodecError;

const CRLF: &str = "\r\n";

#[derive(Debug, Clone)]
pub struct TextCodecProperties {
    pub separator: char,
    pub string_marker: Option<char>,
    pub date_time_format: String,
    pub save_defaults: bool,
    pub no_header: bool,
}

impl Default for TextCodecProperties {
    fn default() -> Self {
        Self {
            separator: ',',
            string_marker: Some('"'),
            date_time_format: "%+".to_string(),
            save_defaults: true,
            no_header: false,
        }
    }
}

impl TextCodecProperties {
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.separator == '\r' || self.separator == '\n' {
            return Err(CodecError::InvalidProperties(
                "separator cannot be a line-break character".into(),
            ));
        }
        if self.string_marker == Some(self.separator) {
            return Err(CodecError::InvalidProperties(
                "string marker cannot equal separator".into(),
            ));
        }
        Ok(())
    }
}

fn encode_string_field(s: &str, marker: Option<char>) -> String {
    let escaped = s.replace('\r', "\\r").replace('\n', "\\n");
    match marker {
        None => escaped,
        Some(q) => {
            if escaped.is_empty() {
                return " ".to_string();
            }
            let doubled: String = escaped
                .chars()
                .flat_map(|c| if c == q { vec![q, q] } else { vec![c] })
                .collect();
            let mut inner = doubled;
            if inner.starts_with(q) {
                inner = format!(" {inner}");
            }
            if inner.ends_with(q) {
                inner = format!("{inner} ");
            }
            format!("{q}{inner}{q}")
        }
    }
}

/// `was_quoted` disambiguates the empty-string sentinel (a bare, unquoted
/// single space) from a genuine one-space value (quoted `" "`, surviving
/// `split_fields` with its marker stripped) — without it both decode the
/// same way and the round trip loses a real `" "` value.
fn decode_string_field(text: &str, marker: Option<char>, was_quoted: bool) -> String {
    if !was_quoted && marker.is_some() && text == " " {
        return String::new();
    }
    let mut result = text.replace("\\r", "\r").replace("\\n", "\n");
    if was_quoted {
        if let Some(q) = marker {
            if result.starts_with(' ') && result[1..].starts_with(q) {
                result.remove(0);
            }
            if result.len() >= 2 && result.ends_with(' ') && result[..result.len() - 1].ends_with(q)
            {
                result.pop();
            }
        }
    }
    result
}

fn encode_value(value: &Value, props: &TextCodecProperties) -> String {
    if !props.save_defaults && value.is_default() {
        return String::new();
    }
    match value {
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int8(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::UInt8(v) => v.to_string(),
        Value::UInt16(v) => v.to_string(),
        Value::UInt32(v) => v.to_string(),
        Value::UInt64(v) => v.to_string(),
        Value::Char(c) => (*c as u32).to_string(),
        Value::Single(f) => f.to_string(),
        Value::Double(f) => f.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::String(s) => encode_string_field(s, props.string_marker),
        Value::User(s) => encode_string_field(s, props.string_marker),
        Value::Binary(b) => {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD_NO_PAD.encode(b)
        }
        Value::DateTime(dt) => dt.format(&props.date_time_format).to_string(),
        Value::TimeSpan(d) => format_timespan(*d),
        Value::Enum { ordinal, .. } => ordinal.to_string(),
        Value::Unknown => String::new(),
    }
}

fn parse_timespan(text: &str, field: &str) -> Result<Duration, CodecError> {
    let err = |reason: String| CodecError::MalformedField {
        field: field.to_string(),
        reason,
    };
    let (negative, rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text),
    };
    let (main, frac) = match rest.rsplit_once('.') {
        Some((m, f)) if f.len() == 7 && f.chars().all(|c| c.is_ascii_digit()) => (m, Some(f)),
        _ => (rest, None),
    };
    let (days, hms) = match main.split_once('.') {
        Some((d, h)) => (
            d.parse::<i64>().map_err(|e| err(e.to_string()))?,
            h,
        ),
        None => (0, main),
    };
    let parts: Vec<&str> = hms.split(':').collect();
    if parts.len() != 3 {
        return Err(err("expected HH:MM:SS".into()));
    }
    let hours: i64 = parts[0].parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?;
    let minutes: i64 = parts[1].parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?;
    let seconds: i64 = parts[2].parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?;
    let nanos: i64 = match frac {
        Some(f) => f.parse::<i64>().map_err(|e: std::num::ParseIntError| err(e.to_string()))? * 100,
        None => 0,
    };
    let mut total = Duration::days(days)
        + Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::nanoseconds(nanos);
    if negative {
        total = -total;
    }
    Ok(total)
}

fn decode_value(
    text: &str,
    data_type: DataType,
    field: &str,
    props: &TextCodecProperties,
    was_quoted: bool,
) -> Result<Value, CodecError> {
    let err = |reason: String| CodecError::MalformedField {
        field: field.to_string(),
        reason,
    };
    if text.is_empty() {
        return Ok(Value::default_for(data_type));
    }
    Ok(match data_type {
        DataType::Bool => Value::Bool(
            text.parse::<i64>().map_err(|e| err(e.to_string()))? != 0,
        ),
        DataType::Int8 => Value::Int8(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::Int16 => Value::Int16(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::Int32 => Value::Int32(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::Int64 => Value::Int64(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::UInt8 => Value::UInt8(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::UInt16 => Value::UInt16(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::UInt32 => Value::UInt32(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::UInt64 => Value::UInt64(text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?),
        DataType::Char => {
            let code: u32 = text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?;
            Value::Char(char::from_u32(code).ok_or_else(|| err("not a valid char code point".into()))?)
        }
        DataType::Single => Value::Single(text.parse().map_err(|e: std::num::ParseFloatError| err(e.to_string()))?),
        DataType::Double => Value::Double(text.parse().map_err(|e: std::num::ParseFloatError| err(e.to_string()))?),
        DataType::Decimal => Value::Decimal(text.parse().map_err(|e: rust_decimal::Error| err(e.to_string()))?),
        DataType::String => Value::String(decode_string_field(text, props.string_marker, was_quoted)),
        DataType::User => Value::User(decode_string_field(text, props.string_marker, was_quoted)),
        DataType::Binary => {
            use base64::Engine as _;
            Value::Binary(
                base64::engine::general_purpose::STANDARD_NO_PAD
                    .decode(text)
                    .map_err(|e| err(e.to_string()))?,
            )
        }
        DataType::DateTime => Value::DateTime(
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| err(e.to_string()))?,
        ),
        DataType::TimeSpan => Value::TimeSpan(parse_timespan(text, field)?),
        DataType::Enum => Value::Enum {
            name: String::new(),
            ordinal: text.parse().map_err(|e: std::num::ParseIntError| err(e.to_string()))?,
        },
        DataType::Unknown => Value::Unknown,
    })
}

/// Splits one line into its fields, alongside whether each field was
/// marker-quoted in the source text (needed to disambiguate the
/// empty-string sentinel from a genuine quoted `" "` value; see
/// [`decode_string_field`]).
fn split_fields(line: &str, separator: char, marker: Option<char>) -> Vec<(String, bool)> {
    match marker {
        None => line
            .split(separator)
            .map(|s| (s.to_string(), false))
            .collect(),
        Some(q) => {
            let mut fields = Vec::new();
            let mut current = String::new();
            let mut in_quotes = false;
            let mut quoted = false;
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                if in_quotes {
                    if c == q {
                        if chars.peek() == Some(&q) {
                            current.push(q);
                            chars.next();
                        } else {
                            in_quotes = false;
                        }
                    } else {
                        current.push(c);
                    }
                } else if c == q && current.is_empty() {
                    in_quotes = true;
                    quoted = true;
                } else if c == separator {
                    fields.push((std::mem::take(&mut current), quoted));
                    quoted = false;
                } else {
                    current.push(c);
                }
            }
            fields.push((current, quoted));
            fields
        }
    }
}

/// Encode one row's fields, joined by `props.separator`. No row terminator
/// is appended — callers writing a stream of rows append `\r\n` themselves
/// (see [`write_rows`]).
pub fn row_to_string(props: &TextCodecProperties, row: &Row) -> String {
    row.values()
        .iter()
        .map(|slot| match slot {
            Some(v) => encode_value(v, props),
            None => String::new(),
        })
        .collect::<Vec<_>>()
        .join(&props.separator.to_string())
}

/// Inverse of [`row_to_string`]: parses one encoded line back into a `Row`.
pub fn parse_row(props: &TextCodecProperties, layout: &std::sync::Arc<RowLayout>, line: &str) -> Result<Row, CodecError> {
    let fields = split_fields(line, props.separator, props.string_marker);
    if fields.len() != layout.field_count() {
        return Err(CodecError::MalformedField {
            field: layout.table_name().to_string(),
            reason: format!(
                "row has {} fields, layout declares {}",
                fields.len(),
                layout.field_count()
            ),
        });
    }
    let mut values = Vec::with_capacity(fields.len());
    for (field, (text, was_quoted)) in layout.fields().iter().zip(fields.iter()) {
        let value = decode_value(text, field.value_type.data_type, &field.name, props, *was_quoted)?;
        // A missing field (saveDefaults=false) decodes to the type's
        // default value, not a null slot — the slot is always populated.
        values.push(Some(value));
    }
    Row::new(layout.clone(), values).map_err(CodecError::from)
}

/// Writes an optional header line, then one line per row of `rows`.
pub fn write_rows<'a, W: Write>(
    writer: &mut W,
    layout: &RowLayout,
    rows: impl IntoIterator<Item = &'a Row>,
    props: &TextCodecProperties,
) -> Result<(), CodecError> {
    props.validate()?;
    if !props.no_header {
        let header = layout
            .fields()
            .iter()
            .map(|f| f.wire_name().to_string())
            .collect::<Vec<_>>()
            .join(&props.separator.to_string());
        write!(writer, "{header}{CRLF}")?;
    }
    for row in rows {
        write!(writer, "{}{CRLF}", row_to_string(props, row))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FieldFlags, FieldProperties};
    use std::sync::Arc;

    fn layout() -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(
                "t",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("s", DataType::String),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn textual_round_trip_scenario() {
        let l = layout();
        let props = TextCodecProperties {
            separator: ',',
            string_marker: Some('"'),
            ..Default::default()
        };
        let row = Row::new(
            l.clone(),
            vec![
                Some(Value::Int64(7)),
                Some(Value::String("he said \"hi\"\nbye".into())),
            ],
        )
        .unwrap();
        let encoded = row_to_string(&props, &row);
        assert_eq!(encoded, "7,\"he said \"\"hi\"\"\\nbye\"");

        let decoded = parse_row(&props, &l, &encoded).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn default_elision_round_trips_when_save_defaults_is_false() {
        let l = layout();
        let props = TextCodecProperties {
            save_defaults: false,
            ..Default::default()
        };
        let row = Row::new(l.clone(), vec![Some(Value::Int64(0)), Some(Value::String(String::new()))]).unwrap();
        let encoded = row_to_string(&props, &row);
        assert_eq!(encoded, ",");
        // A missing field decodes to the type's default value, not a null
        // slot: the id decodes back to 0, the string to "".
        let decoded = parse_row(&props, &l, &encoded).unwrap();
        assert_eq!(decoded.get(0), Some(&Value::Int64(0)));
        assert_eq!(decoded.get(1), Some(&Value::String(String::new())));
    }

    #[test]
    fn a_genuine_single_space_string_survives_the_empty_string_sentinel() {
        let l = layout();
        let props = TextCodecProperties {
            separator: ',',
            string_marker: Some('"'),
            ..Default::default()
        };
        let row = Row::new(
            l.clone(),
            vec![Some(Value::Int64(1)), Some(Value::String(" ".into()))],
        )
        .unwrap();
        let encoded = row_to_string(&props, &row);
        let decoded = parse_row(&props, &l, &encoded).unwrap();
        assert_eq!(decoded, row);

        let empty_row = Row::new(
            l.clone(),
            vec![Some(Value::Int64(1)), Some(Value::String(String::new()))],
        )
        .unwrap();
        let empty_encoded = row_to_string(&props, &empty_row);
        let empty_decoded = parse_row(&props, &l, &empty_encoded).unwrap();
        assert_eq!(empty_decoded, empty_row);
    }
}
