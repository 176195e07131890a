//! `content-disposition` parameters of a form part, read from raw bytes.
//!
//! Parameter values may arrive in a legacy text encoding, so they are
//! extracted as bytes and left to [`super::encoding::FieldCodec`] to decode.
//! Quoted values honour `\"` and `\\` escapes; any other backslash is kept,
//! since multibyte encodings such as Shift_JIS use 0x5C as a trail byte.

/// The `name` and `filename` parameters of a part, undecoded.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PartNames {
    pub name: Option<Vec<u8>>,
    pub filename: Option<Vec<u8>>,
}

/// Parse a header value such as `form-data; name="input"; filename="a.csv"`.
///
/// The first occurrence of each parameter wins. `filename*` is not
/// `filename` and is ignored.
pub fn parse(raw: &[u8]) -> PartNames {
    let mut names = PartNames::default();
    let Some(start) = raw.iter().position(|&b| b == b';') else {
        return names;
    };
    let mut rest = &raw[start + 1..];

    while !rest.is_empty() {
        rest = rest.trim_ascii_start();
        let key_end = rest
            .iter()
            .position(|&b| b == b'=' || b == b';')
            .unwrap_or(rest.len());
        let key = rest[..key_end].trim_ascii_end();
        rest = &rest[key_end..];

        let value = match rest.first() {
            Some(b'=') => {
                let (value, tail) = value(rest[1..].trim_ascii_start());
                rest = tail;
                Some(value)
            }
            _ => None,
        };
        let next = rest.iter().position(|&b| b == b';').map_or(rest.len(), |i| i + 1);
        rest = &rest[next..];

        let Some(value) = value else { continue };
        if key.eq_ignore_ascii_case(b"name") {
            names.name.get_or_insert(value);
        } else if key.eq_ignore_ascii_case(b"filename") {
            names.filename.get_or_insert(value);
        }
    }
    names
}

/// One parameter value and whatever follows it.
fn value(input: &[u8]) -> (Vec<u8>, &[u8]) {
    let Some(quoted) = input.strip_prefix(b"\"") else {
        let end = input.iter().position(|&b| b == b';').unwrap_or(input.len());
        return (input[..end].trim_ascii_end().to_vec(), &input[end..]);
    };

    let mut out = Vec::with_capacity(quoted.len());
    let mut i = 0;
    while i < quoted.len() {
        match quoted[i] {
            b'"' => return (out, &quoted[i + 1..]),
            b'\\' if matches!(quoted.get(i + 1), Some(b'"' | b'\\')) => {
                out.push(quoted[i + 1]);
                i += 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    // Unterminated quote: take everything.
    (out, &quoted[quoted.len()..])
}
