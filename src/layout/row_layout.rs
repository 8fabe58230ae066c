//! `RowLayout`: ordered field metadata plus a table name and optional
//! identifier-field index.

use thiserror::Error;

use super::datatype::DataType;
use super::field::FieldProperties;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("table name {0:?} contains characters outside [A-Za-z0-9_]")]
    InvalidTableName(String),

    #[error("layout declares more than one ID field")]
    MultipleIdFields,

    #[error("schema is not a value-aggregate and cannot be turned into a typed layout")]
    NotAValueAggregate,

    #[error("could not infer a DataType for field {0:?}")]
    CannotInferDataType(String),

    #[error("layout has no identifier field")]
    NoIdentifierField,

    #[error("layouts differ structurally: {0}")]
    LayoutMismatch(String),
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ordered field metadata describing a row shape.
///
/// A `RowLayout` is created once — from a typed schema declaration via
/// [`RowLayoutBuilder`], from a best-effort alien schema, or explicitly via
/// [`RowLayout::untyped`] — then shared read-only by many `Row`s and
/// `Table`s.
#[derive(Debug, Clone)]
pub struct RowLayout {
    table_name: String,
    fields: Vec<FieldProperties>,
    id_index: Option<usize>,
    /// `true` when this layout was constructed with `untyped`: struct
    /// marshaling operations (`FromRow`/`ToRow`) are disallowed.
    untyped: bool,
}

impl RowLayout {
    fn build(
        table_name: impl Into<String>,
        fields: Vec<FieldProperties>,
        untyped: bool,
    ) -> Result<Self, LayoutError> {
        let table_name = table_name.into();
        if !is_safe_name(&table_name) {
            return Err(LayoutError::InvalidTableName(table_name));
        }
        let id_positions: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_id())
            .map(|(i, _)| i)
            .collect();
        if id_positions.len() > 1 {
            return Err(LayoutError::MultipleIdFields);
        }
        Ok(Self {
            table_name,
            fields,
            id_index: id_positions.first().copied(),
            untyped,
        })
    }

    /// Construct a layout not bound to any host schema. Disallows
    /// struct-materialization operations (`FromRow`/`ToRow`).
    pub fn untyped(
        table_name: impl Into<String>,
        fields: Vec<FieldProperties>,
    ) -> Result<Self, LayoutError> {
        Self::build(table_name, fields, true)
    }

    /// Construct a layout that a typed schema may materialize structs
    /// through. Used by [`RowLayoutBuilder::build`].
    pub fn typed(
        table_name: impl Into<String>,
        fields: Vec<FieldProperties>,
    ) -> Result<Self, LayoutError> {
        Self::build(table_name, fields, false)
    }

    /// Best-effort layout from a schema without explicit field annotations.
    /// `fields` should already have array-typed entries filtered out by the
    /// caller, per the alien-schema contract.
    pub fn alien(
        table_name: impl Into<String>,
        fields: Vec<(String, DataType)>,
    ) -> Result<Self, LayoutError> {
        let fields = fields
            .into_iter()
            .map(|(name, dt)| FieldProperties::new(name, dt))
            .collect();
        Self::build(table_name, fields, true)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn fields(&self) -> &[FieldProperties] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_untyped(&self) -> bool {
        self.untyped
    }

    pub fn id_field_index(&self) -> Option<usize> {
        self.id_index
    }

    pub fn field(&self, index: usize) -> Option<&FieldProperties> {
        self.fields.get(index)
    }

    /// O(FieldCount) lookup by primary name, falling through to
    /// alternative-name lists.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| self.fields.iter().position(|f| f.matches_name(name)))
    }

    pub fn indexed_field_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(i, f)| f.is_indexed() && Some(*i) != self.id_index)
            .map(|(i, _)| i)
    }

    /// Structural comparison used at rebind/codec boundaries: same field
    /// count and each `FieldProperties` pair equal in order.
    pub fn check_layout(expected: &RowLayout, actual: &RowLayout) -> Result<(), LayoutError> {
        if expected.fields.len() != actual.fields.len() {
            return Err(LayoutError::LayoutMismatch(format!(
                "field count {} != {}",
                expected.fields.len(),
                actual.fields.len()
            )));
        }
        for (i, (e, a)) in expected.fields.iter().zip(actual.fields.iter()).enumerate() {
            if e != a {
                return Err(LayoutError::LayoutMismatch(format!(
                    "field {i} ({:?}) != ({:?})",
                    e.name, a.name
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for RowLayout {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for RowLayout {}

/// Fluent builder standing in for the reflection-driven `CreateTyped` of a
/// reflection-rich host: the embedding application declares fields
/// explicitly instead of the layout being derived from struct attributes.
#[derive(Debug, Default)]
pub struct RowLayoutBuilder {
    fields: Vec<FieldProperties>,
}

impl RowLayoutBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, field: FieldProperties) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self, table_name: impl Into<String>) -> Result<RowLayout, LayoutError> {
        if self.fields.is_empty() {
            return Err(LayoutError::NotAValueAggregate);
        }
        RowLayout::typed(table_name, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::field::FieldFlags;

    fn id_field() -> FieldProperties {
        FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID)
    }

    #[test]
    fn rejects_unsafe_table_names() {
        let err = RowLayout::untyped("bad name!", vec![id_field()]).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidTableName(_)));
    }

    #[test]
    fn rejects_multiple_id_fields() {
        let err = RowLayout::untyped(
            "t",
            vec![
                id_field(),
                FieldProperties::new("other_id", DataType::Int64).with_flags(FieldFlags::ID),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::MultipleIdFields));
    }

    #[test]
    fn caches_id_field_index() {
        let layout = RowLayout::untyped(
            "t",
            vec![
                FieldProperties::new("name", DataType::String),
                id_field(),
            ],
        )
        .unwrap();
        assert_eq!(layout.id_field_index(), Some(1));
    }

    #[test]
    fn field_index_falls_through_to_alt_names() {
        let layout = RowLayout::untyped(
            "t",
            vec![FieldProperties::new("color", DataType::String)
                .with_alt_names(vec!["colour".into()])],
        )
        .unwrap();
        assert_eq!(layout.field_index("color"), Some(0));
        assert_eq!(layout.field_index("colour"), Some(0));
        assert_eq!(layout.field_index("nope"), None);
    }

    #[test]
    fn two_layouts_equal_iff_fields_equal_in_order() {
        let a = RowLayout::untyped("t", vec![id_field()]).unwrap();
        let b = RowLayout::untyped("u", vec![id_field()]).unwrap();
        assert_eq!(a, b, "table name does not participate in equality");
    }
}
