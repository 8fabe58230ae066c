//! External collaborators the core consumes but does not implement: the
//! `Storage`/`Database` identity a `Table` is bound to, and the compression
//! stream factory the textual codec opens its output through. SQL backend
//! adapters, connection configuration, and concrete Deflate/GZip stream
//! implementations are out of scope for this crate — an embedding
//! application supplies them.

use std::io::{Read, Write};

use crate::layout::{LayoutError, RowLayout};

/// What a `Table` expects from its backing storage identity.
pub trait Storage: Send + Sync {
    fn supports_native_transactions(&self) -> bool;

    fn check_layout(&self, expected: &RowLayout, actual: &RowLayout) -> Result<(), LayoutError> {
        RowLayout::check_layout(expected, actual)
    }

    fn logs_verbose_messages(&self) -> bool {
        false
    }

    /// Escapes `name` for use in a generated SQL identifier. The in-memory
    /// core never calls this itself; it exists for SQL adapters built on
    /// top of this crate.
    fn escape_field_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Row-count window a bulk loader should use when no caller override
    /// is supplied. See [`crate::table::MemoryTable::load_from`].
    fn default_transaction_row_count(&self) -> usize {
        1000
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Deflate,
    GZip,
}

/// Wraps a raw stream for a given [`Compression`] selection. The core ships
/// a passthrough `None` implementation; a caller wanting `Deflate`/`GZip`
/// supplies their own factory (e.g. backed by `flate2`).
pub trait CompressionFactory: Send + Sync {
    fn wrap_writer<'a>(
        &self,
        compression: Compression,
        inner: Box<dyn Write + 'a>,
    ) -> Box<dyn Write + 'a>;

    fn wrap_reader<'a>(
        &self,
        compression: Compression,
        inner: Box<dyn Read + 'a>,
    ) -> Box<dyn Read + 'a>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCompression;

impl CompressionFactory for PassthroughCompression {
    fn wrap_writer<'a>(
        &self,
        compression: Compression,
        inner: Box<dyn Write + 'a>,
    ) -> Box<dyn Write + 'a> {
        match compression {
            Compression::None => inner,
            other => panic!("no compression stream implementation registered for {other:?}"),
        }
    }

    fn wrap_reader<'a>(
        &self,
        compression: Compression,
        inner: Box<dyn Read + 'a>,
    ) -> Box<dyn Read + 'a> {
        match compression {
            Compression::None => inner,
            other => panic!("no compression stream implementation registered for {other:?}"),
        }
    }
}
