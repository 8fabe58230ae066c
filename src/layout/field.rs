//! Field metadata: `FieldProperties`, `FieldFlags`, `ValueType`, `DisplayFormat`.

use bitflags::bitflags;

use super::datatype::DataType;

bitflags! {
    /// Subset of {ID, Index, AutoIncrement, Unique, Nullable} a field may carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u8 {
        const ID             = 0b0000_0001;
        const INDEX          = 0b0000_0010;
        const AUTO_INCREMENT = 0b0000_0100;
        const UNIQUE         = 0b0000_1000;
        const NULLABLE       = 0b0001_0000;
    }
}

impl Default for FieldFlags {
    fn default() -> Self {
        FieldFlags::empty()
    }
}

/// The three recognized meta-format tags, plus an arbitrary culture-sensitive
/// format string. Per the implementer contract, these three are treated as
/// exhaustive unless a caller extends them via `Custom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayFormat {
    FormatTimeSpan,
    FormatValue,
    FormatBinaryValue,
    Custom(String),
}

/// The concrete runtime type backing a field's `DataType` tag.
///
/// For primitive kinds this carries no extra information beyond the tag;
/// `Enum` and `User` fields additionally carry the name of the concrete
/// enum/user type, since multiple distinct enum types can all report
/// `DataType::Enum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueType {
    pub data_type: DataType,
    pub type_name: Option<String>,
}

impl ValueType {
    pub fn primitive(data_type: DataType) -> Self {
        Self {
            data_type,
            type_name: None,
        }
    }

    pub fn named(data_type: DataType, type_name: impl Into<String>) -> Self {
        Self {
            data_type,
            type_name: Some(type_name.into()),
        }
    }
}

/// Metadata for one column.
///
/// Equality is structural over `(name, data_type, flags, value_type)` —
/// `alt_names`, `display_format`, and `disk_name` do not participate, since
/// they're presentation concerns rather than identity.
#[derive(Debug, Clone)]
pub struct FieldProperties {
    pub name: String,
    pub alt_names: Vec<String>,
    pub data_type: DataType,
    pub value_type: ValueType,
    pub flags: FieldFlags,
    pub display_format: Option<DisplayFormat>,
    pub disk_name: Option<String>,
}

impl FieldProperties {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            alt_names: Vec::new(),
            data_type,
            value_type: ValueType::primitive(data_type),
            flags: FieldFlags::empty(),
            display_format: None,
            disk_name: None,
        }
    }

    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_alt_names(mut self, alt_names: Vec<String>) -> Self {
        self.alt_names = alt_names;
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_display_format(mut self, format: DisplayFormat) -> Self {
        self.display_format = Some(format);
        self
    }

    pub fn with_disk_name(mut self, disk_name: impl Into<String>) -> Self {
        self.disk_name = Some(disk_name.into());
        self
    }

    /// The name used on the wire: `disk_name` if set, else `name`.
    pub fn wire_name(&self) -> &str {
        self.disk_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_id(&self) -> bool {
        self.flags.contains(FieldFlags::ID)
    }

    pub fn is_indexed(&self) -> bool {
        self.flags.contains(FieldFlags::INDEX)
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.contains(FieldFlags::NULLABLE)
    }

    /// Does `candidate` match this field's primary or alternative names?
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.name == candidate || self.alt_names.iter().any(|n| n == candidate)
    }
}

impl PartialEq for FieldProperties {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.flags == other.flags
            && self.value_type == other.value_type
    }
}

impl Eq for FieldProperties {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_alt_names_and_display_format() {
        let a = FieldProperties::new("color", DataType::String)
            .with_alt_names(vec!["colour".into()])
            .with_display_format(DisplayFormat::FormatValue);
        let b = FieldProperties::new("color", DataType::String);
        assert_eq!(a, b);
    }

    #[test]
    fn matches_name_checks_alternatives() {
        let f = FieldProperties::new("color", DataType::String)
            .with_alt_names(vec!["colour".into()]);
        assert!(f.matches_name("color"));
        assert!(f.matches_name("colour"));
        assert!(!f.matches_name("Color"));
    }

    #[test]
    fn wire_name_prefers_disk_name() {
        let f = FieldProperties::new("color", DataType::String).with_disk_name("clr");
        assert_eq!(f.wire_name(), "clr");
    }
}
