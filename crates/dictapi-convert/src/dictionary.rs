//! In-memory dictionary model shared by every format.

/// Title used when neither an override nor a usable filename is available.
pub const DEFAULT_TITLE: &str = "dictionary";

/// A parsed dictionary: a title plus an ordered, de-duplicated word list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    pub title: String,
    pub words: Vec<Word>,
}

/// One dictionary entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    /// The displayed form of the word.
    pub text: String,
    /// Accepted answers; empty means `text` itself is the only answer.
    pub answers: Vec<String>,
    pub question: Option<String>,
    pub description: Option<String>,
}

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// True when the word carries anything a plain word list cannot hold.
    pub fn has_extra_data(&self) -> bool {
        !self.answers.is_empty() || self.question.is_some() || self.description.is_some()
    }
}

/// The converted artifact handed back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Pick the dictionary title: explicit override, else the filename stem.
pub(crate) fn resolve_title(title: Option<&str>, filename: &str) -> String {
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_owned();
    }
    // Uploads may carry Windows paths; only the last component matters.
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match base.rfind('.') {
        Some(0) | None => base,
        Some(dot) => &base[..dot],
    };
    let stem = stem.trim();
    if stem.is_empty() {
        DEFAULT_TITLE.to_owned()
    } else {
        stem.to_owned()
    }
}
