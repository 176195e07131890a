//! The immutable per-request view the pipeline works on.
//!
//! [`IncomingRequest`] is built once by the transport layer (see
//! [`extract`]) and only read afterwards.

pub mod disposition;
pub mod encoding;
pub mod extract;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::http::Method;
use tracing::warn;

/// Form field carrying the dictionary file.
pub const INPUT_KEY: &str = "input";

/// Everything the pipeline needs to know about one HTTP request.
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: Method,
    /// Declared body length, or the observed length once it overran the limit.
    pub content_length: Option<u64>,
    /// Text form fields, already normalised to UTF-8.
    pub fields: HashMap<String, String>,
    /// The `input` file part, when one was sent.
    pub upload: Option<UploadSlot>,
}

impl IncomingRequest {
    pub fn new(method: Method, content_length: Option<u64>) -> Self {
        Self {
            method,
            content_length,
            fields: HashMap::new(),
            upload: None,
        }
    }

    /// A text field that was sent and is not empty.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// The uploaded-file slot of a request.
#[derive(Debug)]
pub struct UploadSlot {
    /// Filename as declared by the client.
    pub declared_name: String,
    /// Where the bytes were spooled; removed when the slot is dropped.
    pub storage: SpooledFile,
    /// Raw upload status code, see [`UploadStatus`].
    pub error_code: i64,
    /// Bytes received for this file.
    pub declared_size: u64,
}

impl UploadSlot {
    pub fn new(declared_name: impl Into<String>, storage: SpooledFile, status: UploadStatus, size: u64) -> Self {
        Self {
            declared_name: declared_name.into(),
            storage,
            error_code: status.code(),
            declared_size: size,
        }
    }

    pub fn storage_path(&self) -> &Path {
        self.storage.path()
    }
}

/// Upload status codes, numbered like the classic file-upload error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Ok,
    /// Larger than the configured per-file ceiling.
    IniSize,
    /// Larger than a limit declared by the submitting form.
    FormSize,
    /// The body ended or broke off mid-file.
    Partial,
    /// The file part carried no file.
    NoFile,
    /// The upload directory does not exist.
    NoTmpDir,
    /// The spooled file could not be written.
    CantWrite,
    /// An extension stopped the upload.
    Extension,
}

impl UploadStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::IniSize => 1,
            Self::FormSize => 2,
            Self::Partial => 3,
            Self::NoFile => 4,
            Self::NoTmpDir => 6,
            Self::CantWrite => 7,
            Self::Extension => 8,
        }
    }
}

impl TryFrom<i64> for UploadStatus {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            other => return Err(other),
        })
    }
}

/// A file owned by one request; deleted on drop.
#[derive(Debug)]
pub struct SpooledFile {
    path: PathBuf,
}

impl SpooledFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove spooled upload"),
        }
    }
}
