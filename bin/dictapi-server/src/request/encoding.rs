//! Form-field text normalisation.
//!
//! When the transport delivers form data in a legacy encoding (configured via
//! `DICTAPI_INPUT_ENCODING`), names and values are transcoded to UTF-8 here so
//! the rest of the pipeline only ever sees UTF-8.

use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct FieldCodec {
    encoding: &'static Encoding,
}

impl Default for FieldCodec {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

impl FieldCodec {
    /// Codec for a WHATWG encoding label; unknown labels fall back to UTF-8.
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::default();
        };
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => Self { encoding },
            None => {
                warn!(label, "unknown input encoding; assuming UTF-8");
                Self::default()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn is_utf8(&self) -> bool {
        self.encoding == UTF_8
    }

    /// Transcode raw field bytes to UTF-8.
    pub fn decode(&self, raw: &[u8]) -> String {
        if self.is_utf8() {
            return String::from_utf8_lossy(raw).into_owned();
        }
        let (text, _) = self.encoding.decode_without_bom_handling(raw);
        text.into_owned()
    }
}
