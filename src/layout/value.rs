//! The tagged-union `Value` type backing a row slot.
//!
//! A slot's nullability is carried by the outer `Option<Value>`, not by a
//! variant of `Value` itself (see the design note on boxed heterogeneous
//! values in the crate's architecture notes).

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::datatype::DataType;

/// One value occupying a row slot.
///
/// `Enum` carries both the symbolic name and the underlying ordinal so that
/// lookups by name and by number both work without a side table. `User`
/// carries an opaque, type-specific string produced by the owning
/// application's `ParseValue`/display-format round trip; this core does not
/// interpret its contents.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Char(char),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    TimeSpan(Duration),
    Enum { name: String, ordinal: i64 },
    User(String),
    Unknown,
}

impl Value {
    /// The `DataType` tag this value carries.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Int8(_) => DataType::Int8,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::UInt8(_) => DataType::UInt8,
            Value::UInt16(_) => DataType::UInt16,
            Value::UInt32(_) => DataType::UInt32,
            Value::UInt64(_) => DataType::UInt64,
            Value::Char(_) => DataType::Char,
            Value::Single(_) => DataType::Single,
            Value::Double(_) => DataType::Double,
            Value::Decimal(_) => DataType::Decimal,
            Value::String(_) => DataType::String,
            Value::Binary(_) => DataType::Binary,
            Value::DateTime(_) => DataType::DateTime,
            Value::TimeSpan(_) => DataType::TimeSpan,
            Value::Enum { .. } => DataType::Enum,
            Value::User(_) => DataType::User,
            Value::Unknown => DataType::Unknown,
        }
    }

    /// The zero-element default for a given `DataType`, used when the
    /// textual codec elides a default-valued field.
    pub fn default_for(data_type: DataType) -> Value {
        match data_type {
            DataType::Bool => Value::Bool(false),
            DataType::Int8 => Value::Int8(0),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::UInt8 => Value::UInt8(0),
            DataType::UInt16 => Value::UInt16(0),
            DataType::UInt32 => Value::UInt32(0),
            DataType::UInt64 => Value::UInt64(0),
            DataType::Char => Value::Char('\0'),
            DataType::Single => Value::Single(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::Decimal => Value::Decimal(Decimal::ZERO),
            DataType::String => Value::String(String::new()),
            DataType::Binary => Value::Binary(Vec::new()),
            DataType::DateTime => Value::DateTime(DateTime::<Utc>::UNIX_EPOCH),
            DataType::TimeSpan => Value::TimeSpan(Duration::zero()),
            DataType::Enum => Value::Enum {
                name: String::new(),
                ordinal: 0,
            },
            DataType::User => Value::User(String::new()),
            DataType::Unknown => Value::Unknown,
        }
    }

    /// True when this value equals the zero-element default for its type.
    /// Used by the textual codec's `saveDefaults = false` elision rule.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Bool(b) => !*b,
            Value::Int8(v) => *v == 0,
            Value::Int16(v) => *v == 0,
            Value::Int32(v) => *v == 0,
            Value::Int64(v) => *v == 0,
            Value::UInt8(v) => *v == 0,
            Value::UInt16(v) => *v == 0,
            Value::UInt32(v) => *v == 0,
            Value::UInt64(v) => *v == 0,
            Value::Char(c) => *c == '\0',
            Value::Single(f) => *f == 0.0,
            Value::Double(f) => *f == 0.0,
            Value::Decimal(d) => d.is_zero(),
            Value::String(s) => s.is_empty(),
            Value::Binary(b) => b.is_empty(),
            Value::DateTime(dt) => *dt == DateTime::<Utc>::UNIX_EPOCH,
            Value::TimeSpan(d) => d.is_zero(),
            Value::Enum { ordinal, .. } => *ordinal == 0,
            Value::User(s) => s.is_empty(),
            Value::Unknown => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Single(a), Single(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (TimeSpan(a), TimeSpan(b)) => a == b,
            (Enum { name: n1, ordinal: o1 }, Enum { name: n2, ordinal: o2 }) => {
                n1 == n2 && o1 == o2
            }
            (User(a), User(b)) => a == b,
            (Unknown, Unknown) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (Int8(a), Int8(b)) => a.partial_cmp(b),
            (Int16(a), Int16(b)) => a.partial_cmp(b),
            (Int32(a), Int32(b)) => a.partial_cmp(b),
            (Int64(a), Int64(b)) => a.partial_cmp(b),
            (UInt8(a), UInt8(b)) => a.partial_cmp(b),
            (UInt16(a), UInt16(b)) => a.partial_cmp(b),
            (UInt32(a), UInt32(b)) => a.partial_cmp(b),
            (UInt64(a), UInt64(b)) => a.partial_cmp(b),
            (Char(a), Char(b)) => a.partial_cmp(b),
            (Single(a), Single(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Decimal(a), Decimal(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            (Binary(a), Binary(b)) => a.partial_cmp(b),
            (DateTime(a), DateTime(b)) => a.partial_cmp(b),
            (TimeSpan(a), TimeSpan(b)) => a.partial_cmp(b),
            (Enum { ordinal: o1, .. }, Enum { ordinal: o2, .. }) => o1.partial_cmp(o2),
            (User(a), User(b)) => a.partial_cmp(b),
            (Unknown, Unknown) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Single(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Binary(b) => {
                use base64::Engine as _;
                write!(
                    f,
                    "{}",
                    base64::engine::general_purpose::STANDARD_NO_PAD.encode(b)
                )
            }
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::TimeSpan(d) => write!(f, "{}", format_timespan(*d)),
            Value::Enum { name, .. } => write!(f, "{name}"),
            Value::User(s) => write!(f, "{s}"),
            Value::Unknown => write!(f, ""),
        }
    }
}

/// Canonical textual representation of a `TimeSpan`: `[-]D.HH:MM:SS.fffffff`,
/// with the day component and fractional seconds elided when zero.
pub fn format_timespan(d: Duration) -> std::string::String {
    let negative = d < Duration::zero();
    let abs = if negative { -d } else { d };
    let total_seconds = abs.num_seconds();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    let nanos = (abs - Duration::seconds(total_seconds))
        .num_nanoseconds()
        .unwrap_or(0);

    let mut s = std::string::String::new();
    if negative {
        s.push('-');
    }
    if days != 0 {
        s.push_str(&format!("{days}."));
    }
    s.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if nanos != 0 {
        s.push_str(&format!(".{:07}", nanos / 100));
    }
    s
}

/// Sum of a sequence of `TimeSpan` values.
///
/// **Open question resolved**: the source material's two candidate
/// semantics (summing raw "ticks" vs. summing whole seconds) are
/// incompatible; this implementation sums at full `Duration` (nanosecond)
/// precision — the same precision individual `TimeSpan` values are stored
/// at — so that `sum([a, b]) == a + b` exactly, with no precision lost to
/// truncation at the second boundary.
pub fn sum_timespans<I: IntoIterator<Item = Duration>>(values: I) -> Duration {
    values
        .into_iter()
        .fold(Duration::zero(), |acc, v| acc + v)
}

/// Widen/narrow `value` to `target`, per the conversion matrix `SetValues`
/// uses to coerce host-schema fields to their declared `ValueType`: enum
/// values convert by name or ordinal, `User` values pass through their
/// string form, and primitives widen (but never silently truncate a
/// narrower-to-wider conversion in the wrong direction).
///
/// Returns `None` when no coercion rule applies.
pub fn coerce_value(value: Value, target: DataType) -> Option<Value> {
    use Value::*;
    if value.data_type() == target {
        return Some(value);
    }
    let as_i64 = match &value {
        Bool(b) => Some(*b as i64),
        Int8(v) => Some(*v as i64),
        Int16(v) => Some(*v as i64),
        Int32(v) => Some(*v as i64),
        Int64(v) => Some(*v),
        UInt8(v) => Some(*v as i64),
        UInt16(v) => Some(*v as i64),
        UInt32(v) => Some(*v as i64),
        UInt64(v) => i64::try_from(*v).ok(),
        Enum { ordinal, .. } => Some(*ordinal),
        _ => None,
    };
    match target {
        DataType::Bool => as_i64.map(|v| Bool(v != 0)),
        DataType::Int8 => as_i64.and_then(|v| i8::try_from(v).ok()).map(Int8),
        DataType::Int16 => as_i64.and_then(|v| i16::try_from(v).ok()).map(Int16),
        DataType::Int32 => as_i64.and_then(|v| i32::try_from(v).ok()).map(Int32),
        DataType::Int64 => as_i64.map(Int64),
        DataType::UInt8 => as_i64.and_then(|v| u8::try_from(v).ok()).map(UInt8),
        DataType::UInt16 => as_i64.and_then(|v| u16::try_from(v).ok()).map(UInt16),
        DataType::UInt32 => as_i64.and_then(|v| u32::try_from(v).ok()).map(UInt32),
        DataType::UInt64 => as_i64.and_then(|v| u64::try_from(v).ok()).map(UInt64),
        DataType::Single => match &value {
            Double(d) => Some(Single(*d as f32)),
            _ => as_i64.map(|v| Single(v as f32)),
        },
        DataType::Double => match &value {
            Single(f) => Some(Double(*f as f64)),
            _ => as_i64.map(|v| Double(v as f64)),
        },
        DataType::Decimal => as_i64
            .and_then(|v| Decimal::try_from(v).ok())
            .map(Value::Decimal),
        DataType::Enum => match &value {
            String(s) => Some(Enum {
                name: s.clone(),
                ordinal: 0,
            }),
            _ => as_i64.map(|ordinal| Enum {
                name: std::string::String::new(),
                ordinal,
            }),
        },
        DataType::User => Some(User(value.to_string())),
        DataType::String => Some(String(value.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_default() {
        for dt in [
            DataType::Bool,
            DataType::Int64,
            DataType::String,
            DataType::Binary,
            DataType::TimeSpan,
            DataType::DateTime,
        ] {
            assert!(Value::default_for(dt).is_default());
        }
    }

    #[test]
    fn sum_timespans_is_exact() {
        let a = Duration::seconds(1) + Duration::milliseconds(500);
        let b = Duration::seconds(2) + Duration::milliseconds(250);
        let total = sum_timespans([a, b]);
        assert_eq!(total, a + b);
    }

    #[test]
    fn enum_equality_is_name_and_ordinal() {
        let a = Value::Enum { name: "Red".into(), ordinal: 1 };
        let b = Value::Enum { name: "Red".into(), ordinal: 1 };
        let c = Value::Enum { name: "Red".into(), ordinal: 2 };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
