//! Dictionary conversion collaborator for dictapi.
//!
//! The HTTP layer only depends on the [`Converter`] contract: `parse` turns an
//! uploaded file into a [`Dictionary`], `serialize` renders it as an
//! [`OutputFile`]. Both may attach [`LogEntry`] diagnostics to a successful
//! result and fail with a typed [`ConvertError`].
//!
//! [`BuiltinConverter`] implements the contract for the plain-text formats in
//! [`Format`].

mod csv;
mod decode;
pub mod dictionary;
pub mod error;
pub mod format;
pub mod log;
mod parse;
mod serialize;

pub use dictionary::{DEFAULT_TITLE, Dictionary, OutputFile, Word};
pub use error::ConvertError;
pub use format::Format;
pub use log::{Level, LogEntry, Logged};

use std::path::Path;

/// Parse/serialize contract consumed by the HTTP boundary.
///
/// Implementations are called from a blocking worker thread and must be
/// shareable across requests.
pub trait Converter: Send + Sync {
    /// Read `file` as `from` (auto-detected when `None`). `filename` is the
    /// client-declared name, used for detection and the default title.
    fn parse(
        &self,
        file: &Path,
        from: Option<&str>,
        filename: &str,
        title: Option<&str>,
    ) -> Result<Logged<Dictionary>, ConvertError>;

    /// Render `dictionary` as `to` (the generic format when `None`).
    fn serialize(&self, dictionary: &Dictionary, to: Option<&str>) -> Result<Logged<OutputFile>, ConvertError>;
}

/// The converter shipped with the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl Converter for BuiltinConverter {
    fn parse(
        &self,
        file: &Path,
        from: Option<&str>,
        filename: &str,
        title: Option<&str>,
    ) -> Result<Logged<Dictionary>, ConvertError> {
        let bytes = std::fs::read(file)?;
        parse::parse_bytes(&bytes, from, filename, title)
    }

    fn serialize(&self, dictionary: &Dictionary, to: Option<&str>) -> Result<Logged<OutputFile>, ConvertError> {
        serialize::serialize_dictionary(dictionary, to)
    }
}
