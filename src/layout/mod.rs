//! Layout & Row Model
//!
//! Field metadata, the closed `DataType` taxonomy, and an immutable `Row`
//! bound to a `RowLayout`.

mod datatype;
mod field;
mod row;
mod row_layout;
mod value;

pub use datatype::DataType;
pub use field::{DisplayFormat, FieldFlags, FieldProperties, ValueType};
pub use row::{FromRow, Row, ToRow};
pub use row_layout::{LayoutError, RowLayout, RowLayoutBuilder};
pub use value::{coerce_value, format_timespan, sum_timespans, Value};
