//! Turn uploaded bytes into text.

use encoding_rs::{Encoding, SHIFT_JIS};

use crate::error::ConvertError;
use crate::log::LogEntry;

/// Decode a source file: BOM first, then UTF-8, then Shift_JIS.
///
/// Text that still contains NUL characters after decoding is treated as
/// binary data and rejected.
pub(crate) fn decode_source(bytes: &[u8], logs: &mut Vec<LogEntry>) -> Result<String, ConvertError> {
    let text = if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(ConvertError::syntax(format!(
                "The file starts with a {} byte order mark but is not valid {}.",
                encoding.name(),
                encoding.name()
            )));
        }
        text.into_owned()
    } else if let Ok(text) = std::str::from_utf8(bytes) {
        text.to_owned()
    } else {
        let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(ConvertError::syntax(
                "The file is neither valid UTF-8 nor valid Shift_JIS.",
            ));
        }
        logs.push(LogEntry::warning("The file was not UTF-8 and was read as Shift_JIS."));
        text.into_owned()
    };

    if text.contains('\0') {
        return Err(ConvertError::syntax(
            "The file contains binary data and is not a dictionary.",
        ));
    }
    Ok(text)
}
