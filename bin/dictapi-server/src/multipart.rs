//! `multipart/form-data` encoder for composite responses.
//!
//! Entries are appended in order and encoded verbatim. The boundary is chosen
//! lazily, the first time [`FormData::content_type`] or [`FormData::encode`]
//! is called, and is guaranteed not to occur inside any appended entry.
//! Once chosen it is fixed: further appends fail with
//! [`MultipartError::Sealed`].

use thiserror::Error;

/// Every boundary starts with this; a random integer follows.
pub const BOUNDARY_PREFIX: &str = "----------------------------------------";

/// Redraws allowed before giving up on finding a unique boundary.
pub const MAX_BOUNDARY_ATTEMPTS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("cannot append to form data after its boundary was fixed")]
    Sealed,

    #[error("no unique multipart boundary found after {0} attempts")]
    BoundaryExhausted(usize),
}

/// Source of the random part of a boundary.
pub type RandomSource = fn() -> u64;

/// An append-only multipart body under construction.
pub struct FormData<R = RandomSource> {
    entries: Vec<Vec<u8>>,
    boundary: Option<String>,
    random: R,
}

impl FormData {
    pub fn new() -> Self {
        Self::with_random(rand::random::<u64>)
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FnMut() -> u64> FormData<R> {
    /// Form data drawing boundary numbers from `random`.
    pub fn with_random(random: R) -> Self {
        Self {
            entries: Vec::new(),
            boundary: None,
            random,
        }
    }

    /// Append an entry. `filename` and `content_type` become part headers
    /// when present; `value` is emitted as-is.
    pub fn append(
        &mut self,
        name: &str,
        value: impl AsRef<[u8]>,
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(), MultipartError> {
        if self.boundary.is_some() {
            return Err(MultipartError::Sealed);
        }

        let mut headers = format!("content-disposition: form-data; name={}", quote(name));
        if let Some(filename) = filename {
            headers.push_str("; filename=");
            headers.push_str(&quote(filename));
        }
        headers.push_str("\r\n");
        if let Some(content_type) = content_type {
            headers.push_str("content-type: ");
            headers.push_str(&header_value(content_type));
            headers.push_str("\r\n");
        }
        headers.push_str("\r\n");

        let value = value.as_ref();
        let mut entry = Vec::with_capacity(headers.len() + value.len());
        entry.extend_from_slice(headers.as_bytes());
        entry.extend_from_slice(value);
        self.entries.push(entry);
        Ok(())
    }

    /// The `content-type` header value for the encoded body. Fixes the boundary.
    pub fn content_type(&mut self) -> Result<String, MultipartError> {
        Ok(format!("multipart/form-data; boundary={}", self.boundary()?))
    }

    /// The complete body. Fixes the boundary.
    pub fn encode(&mut self) -> Result<Vec<u8>, MultipartError> {
        let delimiter = format!("--{}", self.boundary()?);
        let size = self.entries.iter().map(Vec::len).sum::<usize>()
            + (self.entries.len() + 1) * (delimiter.len() + 4)
            + 2;
        let mut body = Vec::with_capacity(size);

        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(b"\r\n");
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(delimiter.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(entry);
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(b"--\r\n");
        Ok(body)
    }

    fn boundary(&mut self) -> Result<&str, MultipartError> {
        if self.boundary.is_none() {
            let boundary = self.draw_boundary()?;
            self.boundary = Some(boundary);
        }
        Ok(self.boundary.as_deref().unwrap_or_default())
    }

    fn draw_boundary(&mut self) -> Result<String, MultipartError> {
        for _ in 0..MAX_BOUNDARY_ATTEMPTS {
            let candidate = format!("{BOUNDARY_PREFIX}{}", (self.random)());
            if !self.entries.iter().any(|entry| contains(entry, candidate.as_bytes())) {
                return Ok(candidate);
            }
        }
        Err(MultipartError::BoundaryExhausted(MAX_BOUNDARY_ATTEMPTS))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Make a caller-supplied string safe for a part header: drop everything from
/// the first NUL and turn each line break (`\r\n`, `\r` or `\n`) into a space.
fn header_value(value: &str) -> String {
    let value = value.find('\0').map_or(value, |nul| &value[..nul]);
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// A quoted header parameter with `\` and `"` backslash-escaped.
fn quote(value: &str) -> String {
    let value = header_value(value);
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
