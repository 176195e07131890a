//! Supported dictionary formats and source-format detection.

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};

/// A dictionary file format understood by the built-in converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Format {
    /// Comma-separated values with a header row; the default target.
    #[default]
    #[strum(to_string = "generic", serialize = "汎用辞書")]
    Generic,
    /// One word per line.
    #[strum(to_string = "wordlist", serialize = "単語リスト")]
    WordList,
    /// Tab-separated `question<TAB>answer...` lines.
    #[strum(to_string = "quiz", serialize = "クイズ")]
    Quiz,
}

impl Format {
    /// Resolve a caller-supplied format name; `None` when it is unknown.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name.trim()).ok()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Generic => "text/csv; charset=UTF-8; header=present",
            Self::WordList => "text/plain; charset=UTF-8",
            Self::Quiz => "text/tab-separated-values; charset=UTF-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Generic => "csv",
            Self::WordList => "txt",
            Self::Quiz => "tsv",
        }
    }

    /// Guess the format of already-decoded input from its filename and content.
    pub fn detect(filename: &str, text: &str) -> Self {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Self::Generic,
            "txt" => Self::WordList,
            "tsv" => Self::Quiz,
            _ => Self::sniff(text),
        }
    }

    fn sniff(text: &str) -> Self {
        let first_line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .unwrap_or_default();
        if first_line.contains('\t') {
            Self::Quiz
        } else if first_line
            .split(',')
            .any(|cell| cell.trim().trim_matches('"') == "text")
        {
            Self::Generic
        } else {
            Self::WordList
        }
    }
}
