//! Binary "dat" row codec: a version byte, a self-describing layout header,
//! then a stream of length-framed row records.

use std::io::{Read, Write};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::layout::{DisplayFormat, FieldFlags, FieldProperties, LayoutError, Row, RowLayout, Value, ValueType};

use super::error::CodecError;

/// Current on-disk version this writer emits. Readers accept this and any
/// earlier known version; there is only one version so far.
pub const CURRENT_VERSION: u8 = 1;

fn write_varint<W: Write>(w: &mut W, mut value: u64) -> std::io::Result<()> {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        w.write_all(&[byte])?;
        if value == 0 {
            return Ok(());
        }
    }
}

fn read_varint<R: Read>(r: &mut R) -> std::io::Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let mut buf = [0u8; 1];
        r.read_exact(&mut buf)?;
        value |= ((buf[0] & 0x7f) as u64) << shift;
        if buf[0] & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn write_string<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    write_varint(w, s.len() as u64)?;
    w.write_all(s.as_bytes())
}

fn read_string<R: Read>(r: &mut R) -> std::io::Result<String> {
    let len = read_varint(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn write_option_string<W: Write>(w: &mut W, s: Option<&str>) -> std::io::Result<()> {
    match s {
        Some(s) => {
            w.write_all(&[1])?;
            write_string(w, s)
        }
        None => w.write_all(&[0]),
    }
}

fn read_option_string<R: Read>(r: &mut R) -> std::io::Result<Option<String>> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;
    if tag[0] == 0 {
        Ok(None)
    } else {
        Ok(Some(read_string(r)?))
    }
}

fn write_field<W: Write>(w: &mut W, field: &FieldProperties) -> std::io::Result<()> {
    write_string(w, &field.name)?;
    write_varint(w, field.alt_names.len() as u64)?;
    for alt in &field.alt_names {
        write_string(w, alt)?;
    }
    write_string(w, &field.data_type.to_string())?;
    write_option_string(w, field.value_type.type_name.as_deref())?;
    write_varint(w, field.flags.bits() as u64)?;
    match &field.display_format {
        None => w.write_all(&[0])?,
        Some(DisplayFormat::FormatTimeSpan) => w.write_all(&[1])?,
        Some(DisplayFormat::FormatValue) => w.write_all(&[2])?,
        Some(DisplayFormat::FormatBinaryValue) => w.write_all(&[3])?,
        Some(DisplayFormat::Custom(fmt)) => {
            w.write_all(&[4])?;
            write_string(w, fmt)?;
        }
    }
    write_option_string(w, field.disk_name.as_deref())?;
    Ok(())
}

fn read_field<R: Read>(r: &mut R) -> Result<FieldProperties, CodecError> {
    let name = read_string(r)?;
    let alt_count = read_varint(r)?;
    let mut alt_names = Vec::with_capacity(alt_count as usize);
    for _ in 0..alt_count {
        alt_names.push(read_string(r)?);
    }
    let data_type_name = read_string(r)?;
    let data_type = data_type_name
        .parse()
        .map_err(|_| CodecError::MalformedField {
            field: name.clone(),
            reason: format!("unknown data type {data_type_name:?}"),
        })?;
    let type_name = read_option_string(r)?;
    let flags_bits = read_varint(r)? as u8;
    let flags = FieldFlags::from_bits_truncate(flags_bits);
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;
    let display_format = match tag[0] {
        0 => None,
        1 => Some(DisplayFormat::FormatTimeSpan),
        2 => Some(DisplayFormat::FormatValue),
        3 => Some(DisplayFormat::FormatBinaryValue),
        4 => Some(DisplayFormat::Custom(read_string(r)?)),
        other => {
            return Err(CodecError::MalformedField {
                field: name,
                reason: format!("unknown display format tag {other}"),
            })
        }
    };
    let disk_name = read_option_string(r)?;

    let mut field = FieldProperties::new(name, data_type)
        .with_alt_names(alt_names)
        .with_flags(flags)
        .with_value_type(match type_name {
            Some(n) => ValueType::named(data_type, n),
            None => ValueType::primitive(data_type),
        });
    if let Some(fmt) = display_format {
        field = field.with_display_format(fmt);
    }
    if let Some(disk_name) = disk_name {
        field = field.with_disk_name(disk_name);
    }
    Ok(field)
}

fn write_value<W: Write>(w: &mut W, value: &Value) -> std::io::Result<()> {
    match value {
        Value::Bool(b) => w.write_all(&[*b as u8]),
        Value::Int8(v) => w.write_all(&v.to_le_bytes()),
        Value::Int16(v) => w.write_all(&v.to_le_bytes()),
        Value::Int32(v) => w.write_all(&v.to_le_bytes()),
        Value::Int64(v) => w.write_all(&v.to_le_bytes()),
        Value::UInt8(v) => w.write_all(&v.to_le_bytes()),
        Value::UInt16(v) => w.write_all(&v.to_le_bytes()),
        Value::UInt32(v) => w.write_all(&v.to_le_bytes()),
        Value::UInt64(v) => w.write_all(&v.to_le_bytes()),
        Value::Char(c) => w.write_all(&(*c as u32).to_le_bytes()),
        Value::Single(f) => w.write_all(&f.to_le_bytes()),
        Value::Double(f) => w.write_all(&f.to_le_bytes()),
        Value::Decimal(d) => write_string(w, &d.to_string()),
        Value::String(s) => write_string(w, s),
        Value::User(s) => write_string(w, s),
        Value::Binary(b) => {
            write_varint(w, b.len() as u64)?;
            w.write_all(b)
        }
        Value::DateTime(dt) => {
            let nanos = dt.timestamp_nanos_opt().unwrap_or(0);
            w.write_all(&nanos.to_le_bytes())
        }
        Value::TimeSpan(d) => {
            let nanos = d.num_nanoseconds().unwrap_or(0);
            w.write_all(&nanos.to_le_bytes())
        }
        Value::Enum { name, ordinal } => {
            write_string(w, name)?;
            w.write_all(&ordinal.to_le_bytes())
        }
        Value::Unknown => Ok(()),
    }
}

fn read_value<R: Read>(r: &mut R, data_type: crate::layout::DataType) -> Result<Value, CodecError> {
    use crate::layout::DataType as DT;
    Ok(match data_type {
        DT::Bool => {
            let mut b = [0u8; 1];
            r.read_exact(&mut b)?;
            Value::Bool(b[0] != 0)
        }
        DT::Int8 => {
            let mut b = [0u8; 1];
            r.read_exact(&mut b)?;
            Value::Int8(i8::from_le_bytes(b))
        }
        DT::Int16 => {
            let mut b = [0u8; 2];
            r.read_exact(&mut b)?;
            Value::Int16(i16::from_le_bytes(b))
        }
        DT::Int32 => {
            let mut b = [0u8; 4];
            r.read_exact(&mut b)?;
            Value::Int32(i32::from_le_bytes(b))
        }
        DT::Int64 => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            Value::Int64(i64::from_le_bytes(b))
        }
        DT::UInt8 => {
            let mut b = [0u8; 1];
            r.read_exact(&mut b)?;
            Value::UInt8(u8::from_le_bytes(b))
        }
        DT::UInt16 => {
            let mut b = [0u8; 2];
            r.read_exact(&mut b)?;
            Value::UInt16(u16::from_le_bytes(b))
        }
        DT::UInt32 => {
            let mut b = [0u8; 4];
            r.read_exact(&mut b)?;
            Value::UInt32(u32::from_le_bytes(b))
        }
        DT::UInt64 => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            Value::UInt64(u64::from_le_bytes(b))
        }
        DT::Char => {
            let mut b = [0u8; 4];
            r.read_exact(&mut b)?;
            let code = u32::from_le_bytes(b);
            Value::Char(char::from_u32(code).ok_or_else(|| CodecError::MalformedField {
                field: "<value>".into(),
                reason: "invalid char code point".into(),
            })?)
        }
        DT::Single => {
            let mut b = [0u8; 4];
            r.read_exact(&mut b)?;
            Value::Single(f32::from_le_bytes(b))
        }
        DT::Double => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            Value::Double(f64::from_le_bytes(b))
        }
        DT::Decimal => Value::Decimal(read_string(r)?.parse().map_err(|e: rust_decimal::Error| {
            CodecError::MalformedField {
                field: "<value>".into(),
                reason: e.to_string(),
            }
        })?),
        DT::String => Value::String(read_string(r)?),
        DT::User => Value::User(read_string(r)?),
        DT::Binary => {
            let len = read_varint(r)? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            Value::Binary(buf)
        }
        DT::DateTime => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            let nanos = i64::from_le_bytes(b);
            let secs = nanos.div_euclid(1_000_000_000);
            let subsec = nanos.rem_euclid(1_000_000_000) as u32;
            Value::DateTime(DateTime::<Utc>::from_timestamp(secs, subsec).ok_or_else(|| {
                CodecError::MalformedField {
                    field: "<value>".into(),
                    reason: "timestamp out of range".into(),
                }
            })?)
        }
        DT::TimeSpan => {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            Value::TimeSpan(Duration::nanoseconds(i64::from_le_bytes(b)))
        }
        DT::Enum => {
            let name = read_string(r)?;
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            Value::Enum {
                name,
                ordinal: i64::from_le_bytes(b),
            }
        }
        DT::Unknown => Value::Unknown,
    })
}

/// Caller-supplied hook letting benign rename/display-format-only
/// differences pass `CheckLayout` instead of failing it. Applied to the
/// layout read from the stream before it is compared against the caller's
/// expected layout.
pub trait LayoutAdjust {
    fn adjust(&self, field: FieldProperties) -> FieldProperties;
}

/// No adjustment: the read layout must match the expected layout exactly.
pub struct NoAdjust;

impl LayoutAdjust for NoAdjust {
    fn adjust(&self, field: FieldProperties) -> FieldProperties {
        field
    }
}

/// Streams rows out of a dat-format source.
pub struct DatReader<R: Read> {
    inner: R,
    version: u8,
    layout: Arc<RowLayout>,
}

impl<R: Read> DatReader<R> {
    pub fn open(mut inner: R) -> Result<Self, CodecError> {
        let mut version_byte = [0u8; 1];
        inner.read_exact(&mut version_byte)?;
        let version = version_byte[0];
        if version > CURRENT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let table_name = read_string(&mut inner)?;
        let field_count = read_varint(&mut inner)?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(read_field(&mut inner)?);
        }
        let layout = Arc::new(RowLayout::untyped(table_name, fields)?);
        Ok(Self {
            inner,
            version,
            layout,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    /// Reads one row. `expected` is compared against the stream's layout via
    /// `CheckLayout` (through `adjust`) on the first call only.
    pub fn read_row(
        &mut self,
        expected: Option<&RowLayout>,
        adjust: &dyn LayoutAdjust,
    ) -> Result<Option<Row>, CodecError> {
        if let Some(expected) = expected {
            let adjusted_fields = self
                .layout
                .fields()
                .iter()
                .cloned()
                .map(|f| adjust.adjust(f))
                .collect();
            let adjusted = RowLayout::untyped(self.layout.table_name(), adjusted_fields)?;
            RowLayout::check_layout(expected, &adjusted)?;
        }

        let mut len_buf = [0u8; 1];
        match self.inner.read(&mut len_buf) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(CodecError::from(e)),
        }
        let mut rest = vec![0u8; 0];
        // len_buf[0] is the first varint byte; continue reading the varint.
        let frame_len = {
            let mut value = (len_buf[0] & 0x7f) as u64;
            let mut shift = 7u32;
            let mut byte = len_buf[0];
            while byte & 0x80 != 0 {
                let mut b = [0u8; 1];
                self.inner.read_exact(&mut b)?;
                byte = b[0];
                value |= ((byte & 0x7f) as u64) << shift;
                shift += 7;
            }
            value
        };
        rest.resize(frame_len as usize, 0);
        self.inner.read_exact(&mut rest)?;
        let mut cursor = std::io::Cursor::new(rest);

        let mut values = Vec::with_capacity(self.layout.field_count());
        for field in self.layout.fields() {
            let mut present = [0u8; 1];
            cursor.read_exact(&mut present)?;
            if present[0] == 0 {
                values.push(None);
            } else {
                values.push(Some(read_value(&mut cursor, field.data_type)?));
            }
        }
        Ok(Some(Row::new(self.layout.clone(), values)?))
    }
}

/// Writes rows to a dat-format sink.
pub struct DatWriter<W: Write> {
    inner: W,
    layout: Arc<RowLayout>,
}

impl<W: Write> DatWriter<W> {
    pub fn create(mut inner: W, layout: Arc<RowLayout>) -> Result<Self, CodecError> {
        inner.write_all(&[CURRENT_VERSION])?;
        write_string(&mut inner, layout.table_name())?;
        write_varint(&mut inner, layout.field_count() as u64)?;
        for field in layout.fields() {
            write_field(&mut inner, field)?;
        }
        Ok(Self { inner, layout })
    }

    pub fn write_row(&mut self, row: &Row) -> Result<(), CodecError> {
        let mut frame = Vec::new();
        for slot in row.values() {
            match slot {
                Some(v) => {
                    frame.push(1u8);
                    write_value(&mut frame, v)?;
                }
                None => frame.push(0u8),
            }
        }
        write_varint(&mut self.inner, frame.len() as u64)?;
        self.inner.write_all(&frame)?;
        Ok(())
    }

    pub fn write_table<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) -> Result<(), CodecError> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush().map_err(CodecError::from)
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DataType;

    fn layout() -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(
                "people",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("name", DataType::String),
                    FieldProperties::new("hired", DataType::DateTime),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn round_trips_layout_and_rows() {
        let l = layout();
        let rows = vec![
            Row::new(
                l.clone(),
                vec![
                    Some(Value::Int64(1)),
                    Some(Value::String("ada".into())),
                    Some(Value::DateTime(DateTime::<Utc>::UNIX_EPOCH)),
                ],
            )
            .unwrap(),
            Row::new(l.clone(), vec![Some(Value::Int64(2)), None, None]).unwrap(),
        ];

        let mut buf = Vec::new();
        {
            let mut writer = DatWriter::create(&mut buf, l.clone()).unwrap();
            writer.write_table(&rows).unwrap();
            writer.flush().unwrap();
        }

        let mut reader = DatReader::open(std::io::Cursor::new(buf)).unwrap();
        assert_eq!(reader.version(), CURRENT_VERSION);
        assert_eq!(reader.layout().table_name(), "people");

        let mut read_back = Vec::new();
        while let Some(row) = reader.read_row(Some(&l), &NoAdjust).unwrap() {
            read_back.push(row);
        }
        assert_eq!(read_back, rows);
    }

    struct RenameAdjust;
    impl LayoutAdjust for RenameAdjust {
        fn adjust(&self, field: FieldProperties) -> FieldProperties {
            if field.name == "hired" {
                FieldProperties::new("hire_date", field.data_type)
            } else {
                field
            }
        }
    }

    #[test]
    fn layout_adjust_hook_tolerates_a_benign_rename() {
        let l = layout();
        let mut buf = Vec::new();
        {
            let mut writer = DatWriter::create(&mut buf, l.clone()).unwrap();
            writer
                .write_row(&Row::new(l.clone(), vec![Some(Value::Int64(1)), None, None]).unwrap())
                .unwrap();
        }

        let renamed_expected = Arc::new(
            RowLayout::untyped(
                "people",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("name", DataType::String),
                    FieldProperties::new("hire_date", DataType::DateTime),
                ],
            )
            .unwrap(),
        );

        let mut reader = DatReader::open(std::io::Cursor::new(buf)).unwrap();
        let row = reader
            .read_row(Some(&renamed_expected), &RenameAdjust)
            .unwrap();
        assert!(row.is_some());
    }

    #[test]
    fn mismatched_layout_is_rejected() {
        let l = layout();
        let mut buf = Vec::new();
        DatWriter::create(&mut buf, l.clone()).unwrap();

        let wrong = Arc::new(
            RowLayout::untyped("people", vec![FieldProperties::new("id", DataType::Int64)]).unwrap(),
        );
        let mut reader = DatReader::open(std::io::Cursor::new(buf)).unwrap();
        let err = reader.read_row(Some(&wrong), &NoAdjust).unwrap_err();
        assert!(matches!(err, CodecError::Layout(LayoutError::LayoutMismatch(_))));
    }
}
