//! `Row`: an immutable logical tuple bound to a `RowLayout`.

use std::sync::Arc;

use super::field::DisplayFormat;
use super::row_layout::{LayoutError, RowLayout};
use super::value::{format_timespan, Value};

/// An immutable tuple of values bound to a [`RowLayout`].
///
/// Mutating operations (`with_value`) produce new `Row`s; a `Row` built
/// from a host struct via [`ToRow`] shares no storage with the struct.
#[derive(Debug, Clone)]
pub struct Row {
    layout: Arc<RowLayout>,
    values: Vec<Option<Value>>,
}

impl Row {
    /// Construct a row bound to `layout`. Fails if `values.len()` does not
    /// match the layout's field count.
    pub fn new(layout: Arc<RowLayout>, values: Vec<Option<Value>>) -> Result<Self, LayoutError> {
        if values.len() != layout.field_count() {
            return Err(LayoutError::LayoutMismatch(format!(
                "row has {} values, layout has {} fields",
                values.len(),
                layout.field_count()
            )));
        }
        Ok(Self { layout, values })
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self.layout.field_index(name)?;
        self.get(idx)
    }

    /// Returns a new row with `index` set to `value`.
    pub fn with_value(&self, index: usize, value: Option<Value>) -> Row {
        let mut values = self.values.clone();
        if index < values.len() {
            values[index] = value;
        }
        Row {
            layout: self.layout.clone(),
            values,
        }
    }

    /// The row's identifier, via the layout's ID field.
    ///
    /// Fails with `NoIdentifierField` if the layout declares none, or if
    /// the ID slot is null.
    pub fn id(&self) -> Result<i64, LayoutError> {
        let idx = self
            .layout
            .id_field_index()
            .ok_or(LayoutError::NoIdentifierField)?;
        let value = self.get(idx).ok_or(LayoutError::NoIdentifierField)?;
        value_as_i64(value).ok_or(LayoutError::NoIdentifierField)
    }

    /// Format a slot for display, honoring the field's `DisplayFormat` when
    /// set. This is distinct from the canonical on-wire form the text and
    /// dat codecs use: it's for human-facing presentation only.
    pub fn display_value(&self, index: usize) -> String {
        let Some(field) = self.layout.field(index) else {
            return String::new();
        };
        let Some(value) = self.get(index) else {
            return String::new();
        };
        match field.display_format.as_ref() {
            Some(DisplayFormat::FormatTimeSpan) => {
                if let Value::TimeSpan(d) = value {
                    format_timespan(*d)
                } else {
                    value.to_string()
                }
            }
            Some(DisplayFormat::FormatValue) => value.to_string(),
            Some(DisplayFormat::FormatBinaryValue) => {
                if let Value::Binary(bytes) = value {
                    bytes
                        .iter()
                        .map(|b| format!("{b:02x}"))
                        .collect::<String>()
                } else {
                    value.to_string()
                }
            }
            Some(DisplayFormat::Custom(fmt)) => match value {
                Value::DateTime(dt) => dt.format(fmt).to_string(),
                other => other.to_string(),
            },
            None => value.to_string(),
        }
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int8(v) => Some(*v as i64),
        Value::Int16(v) => Some(*v as i64),
        Value::Int32(v) => Some(*v as i64),
        Value::Int64(v) => Some(*v),
        Value::UInt8(v) => Some(*v as i64),
        Value::UInt16(v) => Some(*v as i64),
        Value::UInt32(v) => Some(*v as i64),
        Value::UInt64(v) => i64::try_from(*v).ok(),
        _ => None,
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.layout == other.layout && self.values == other.values
    }
}

/// Marshal a host-schema record into row values. Only implemented for
/// layouts produced by [`super::row_layout::RowLayoutBuilder`] (typed, not
/// `untyped`/`alien`).
pub trait ToRow {
    fn to_row(&self, layout: Arc<RowLayout>) -> Result<Row, LayoutError>;
}

/// Marshal row values back into a host-schema record. The inverse of
/// [`ToRow`].
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, LayoutError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::datatype::DataType;
    use crate::layout::field::{FieldFlags, FieldProperties};

    fn layout() -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(
                "t",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("name", DataType::String),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn id_reads_through_widening() {
        let row = Row::new(
            layout(),
            vec![
                Some(Value::Int64(7)),
                Some(Value::String("hi".into())),
            ],
        )
        .unwrap();
        assert_eq!(row.id().unwrap(), 7);
    }

    #[test]
    fn no_id_field_fails() {
        let layout = Arc::new(
            RowLayout::untyped("t", vec![FieldProperties::new("name", DataType::String)])
                .unwrap(),
        );
        let row = Row::new(layout, vec![Some(Value::String("hi".into()))]).unwrap();
        assert!(matches!(row.id(), Err(LayoutError::NoIdentifierField)));
    }

    #[test]
    fn with_value_does_not_mutate_original() {
        let row = Row::new(
            layout(),
            vec![Some(Value::Int64(1)), Some(Value::String("a".into()))],
        )
        .unwrap();
        let updated = row.with_value(1, Some(Value::String("b".into())));
        assert_eq!(row.get(1), Some(&Value::String("a".into())));
        assert_eq!(updated.get(1), Some(&Value::String("b".into())));
    }

    #[test]
    fn value_equality_recurses_into_binary_arrays() {
        let l = layout();
        let a = Row::new(
            l.clone(),
            vec![Some(Value::Int64(1)), Some(Value::String("a".into()))],
        )
        .unwrap();
        let b = Row::new(
            l,
            vec![Some(Value::Int64(1)), Some(Value::String("a".into()))],
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
