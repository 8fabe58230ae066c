//! Codecs
//!
//! Two row serializations sharing no format details: a separator-delimited
//! [`text`] codec meant for human-editable interchange, and a
//! self-describing binary [`dat`] codec meant for compact persistence.

mod dat;
mod error;
mod text;

pub use dat::{DatReader, DatWriter, LayoutAdjust, NoAdjust, CURRENT_VERSION};
pub use error::CodecError;
pub use text::{parse_row, row_to_string, write_rows, TextCodecProperties};
