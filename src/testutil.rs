//! Test harness for building layouts and populated tables tersely.
//!
//! Mirrors the fluent catalog-builder pattern of the broader corpus: tests
//! compose a layout and a table's initial rows declaratively instead of
//! hand-assembling `FieldProperties`/`Row` values inline.
//!
//! ```
//! use tabula::layout::{DataType, Value};
//! use tabula::testutil::{LayoutBuilder, TableBuilder};
//!
//! let layout = LayoutBuilder::new("widgets")
//!     .id("id")
//!     .indexed_field("color", DataType::String)
//!     .build();
//!
//! let table = TableBuilder::new(layout)
//!     .row(vec![Some(Value::Int64(0)), Some(Value::String("red".into()))])
//!     .build();
//! assert_eq!(table.count(), 1);
//! ```

use std::sync::Arc;

use crate::layout::{DataType, FieldFlags, FieldProperties, Row, RowLayout, Value};
use crate::table::MemoryTable;

pub struct LayoutBuilder {
    table_name: String,
    fields: Vec<FieldProperties>,
}

impl LayoutBuilder {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds an `Int64` identifier field named `name`.
    pub fn id(mut self, name: &str) -> Self {
        self.fields
            .push(FieldProperties::new(name, DataType::Int64).with_flags(FieldFlags::ID));
        self
    }

    pub fn field(mut self, name: &str, data_type: DataType) -> Self {
        self.fields.push(FieldProperties::new(name, data_type));
        self
    }

    pub fn indexed_field(mut self, name: &str, data_type: DataType) -> Self {
        self.fields
            .push(FieldProperties::new(name, data_type).with_flags(FieldFlags::INDEX));
        self
    }

    pub fn build(self) -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(self.table_name, self.fields)
                .expect("test layout is well-formed"),
        )
    }
}

/// Builder for constructing a populated [`MemoryTable`] tersely in tests.
/// Rows are inserted in the order declared, through the table's normal
/// `insert` path (so auto-id assignment and index maintenance apply).
pub struct TableBuilder {
    layout: Arc<RowLayout>,
    rows: Vec<Vec<Option<Value>>>,
}

impl TableBuilder {
    pub fn new(layout: Arc<RowLayout>) -> Self {
        Self {
            layout,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: Vec<Option<Value>>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn build(self) -> MemoryTable {
        let mut table = MemoryTable::new(self.layout.clone());
        for values in self.rows {
            let row = Row::new(self.layout.clone(), values).expect("row matches builder's layout");
            table.insert(row).expect("test table insert succeeds");
        }
        table
    }
}
