//! The closed `DataType` enumeration and its associated behavior.
//!
//! Each tag determines serialization, comparison, default value, and
//! sum-compatibility for the `Value` variant it backs.

use strum_macros::{Display, EnumString};

/// Closed enumeration of the value kinds a row slot can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Char,
    Single,
    Double,
    Decimal,
    String,
    Binary,
    DateTime,
    TimeSpan,
    Enum,
    User,
    Unknown,
}

impl DataType {
    /// True for the fixed-width numeric kinds (everything with a machine
    /// integer or float representation, including `Bool` and `Char`).
    pub fn is_primitive(self) -> bool {
        !matches!(
            self,
            DataType::String
                | DataType::Binary
                | DataType::DateTime
                | DataType::TimeSpan
                | DataType::Enum
                | DataType::User
                | DataType::Unknown
        )
    }

    /// Whether two values of this type combine meaningfully under sum
    /// aggregation. Numeric kinds, `TimeSpan`, and `Decimal` are
    /// sum-compatible; everything else is not.
    pub fn is_sum_compatible(self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Single
                | DataType::Double
                | DataType::Decimal
                | DataType::TimeSpan
        )
    }
}
