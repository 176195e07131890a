//! Upload size ceilings.
//!
//! Three independently configured limits bound an upload: the per-file
//! ceiling, the whole request body ceiling and the memory available to
//! process one request. The effective limit is their minimum.

/// Byte ceilings, already parsed from their ini-style shorthand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest single uploaded file.
    pub upload_max_filesize: u64,
    /// Largest request body.
    pub post_max_size: u64,
    /// Memory available to one request.
    pub memory_limit: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            upload_max_filesize: 2 * MIB,
            post_max_size: 8 * MIB,
            memory_limit: 128 * MIB,
        }
    }
}

impl UploadLimits {
    /// The effective maximum request size.
    pub fn resolve(&self) -> u64 {
        self.upload_max_filesize
            .min(self.post_max_size)
            .min(self.memory_limit)
    }
}

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Parse an ini-style byte size such as `"512"`, `"8M"` or `"1g"`.
///
/// `-1` means unlimited. Returns `None` for anything else that is not a
/// non-negative integer with an optional `K`/`M`/`G` suffix.
pub fn parse_byte_size(value: &str) -> Option<u64> {
    let value = value.trim();
    if value == "-1" {
        return Some(u64::MAX);
    }
    let (digits, multiplier) = match value.as_bytes().last()?.to_ascii_lowercase() {
        b'k' => (&value[..value.len() - 1], KIB),
        b'm' => (&value[..value.len() - 1], MIB),
        b'g' => (&value[..value.len() - 1], GIB),
        _ => (value, 1),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()?.checked_mul(multiplier)
}

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size in binary multiples, rounded to a whole number.
pub fn format_bytes(bytes: u64) -> String {
    let mut unit = 0;
    let mut divisor: u128 = 1;
    while unit + 1 < UNITS.len() && u128::from(bytes) >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }
    let value = (u128::from(bytes) + divisor / 2) / divisor;
    format!("{value} {}", UNITS[unit])
}
