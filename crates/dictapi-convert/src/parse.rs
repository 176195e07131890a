//! Source-format readers.

use std::collections::HashSet;

use tracing::debug;

use crate::csv::{self, Record};
use crate::decode::decode_source;
use crate::dictionary::{Dictionary, Word, resolve_title};
use crate::error::ConvertError;
use crate::format::Format;
use crate::log::{LogEntry, Logged};

/// Parse raw upload bytes into a [`Dictionary`].
pub(crate) fn parse_bytes(
    bytes: &[u8],
    from: Option<&str>,
    filename: &str,
    title: Option<&str>,
) -> Result<Logged<Dictionary>, ConvertError> {
    let mut logs = Vec::new();
    let requested = match from {
        Some(name) => Some(Format::from_name(name).ok_or_else(|| {
            ConvertError::syntax(format!("\"{name}\" is not a supported source format."))
        })?),
        None => None,
    };
    let text = decode_source(bytes, &mut logs)?;
    let format = requested.unwrap_or_else(|| Format::detect(filename, &text));
    debug!(%format, filename, detected = requested.is_none(), "parsing dictionary");

    let mut words = WordSet::default();
    match format {
        Format::Generic => read_generic(&text, &mut words, &mut logs)?,
        Format::WordList => read_word_list(&text, &mut words, &mut logs),
        Format::Quiz => read_quiz(&text, &mut words, &mut logs)?,
    }

    if words.list.is_empty() {
        return Err(ConvertError::syntax("The dictionary contains no words."));
    }
    let dictionary = Dictionary {
        title: resolve_title(title, filename),
        words: words.list,
    };
    Ok(Logged::new(dictionary, logs))
}

/// Insertion-ordered word list that skips duplicates with a warning.
#[derive(Default)]
struct WordSet {
    seen: HashSet<String>,
    list: Vec<Word>,
}

impl WordSet {
    fn push(&mut self, word: Word, line: usize, logs: &mut Vec<LogEntry>) {
        if self.seen.insert(word.text.clone()) {
            self.list.push(word);
        } else {
            logs.push(LogEntry::warning(format!(
                "Line {line}: \"{}\" is a duplicate and was skipped.",
                word.text
            )));
        }
    }
}

#[derive(Default)]
struct Columns {
    text: usize,
    answers: Vec<usize>,
    question: Option<usize>,
    description: Option<usize>,
}

fn read_generic(text: &str, words: &mut WordSet, logs: &mut Vec<LogEntry>) -> Result<(), ConvertError> {
    let records = csv::read_records(text)?;
    let Some((header, rows)) = records.split_first() else {
        return Err(ConvertError::syntax("The CSV file is empty."));
    };

    let mut columns = Columns::default();
    let mut has_text = false;
    for (index, name) in header.fields.iter().enumerate() {
        match name.trim() {
            "text" if !has_text => {
                columns.text = index;
                has_text = true;
            }
            "answer" => columns.answers.push(index),
            "question" if columns.question.is_none() => columns.question = Some(index),
            "description" if columns.description.is_none() => columns.description = Some(index),
            other => logs.push(LogEntry::notice(format!(
                "The column \"{other}\" is not supported and was ignored."
            ))),
        }
    }
    if !has_text {
        return Err(ConvertError::syntax("The header row has no \"text\" column."));
    }

    for row in rows {
        if row.fields.len() > header.fields.len() {
            return Err(ConvertError::syntax(format!(
                "Line {}: the row has {} fields but the header has {}.",
                row.line,
                row.fields.len(),
                header.fields.len()
            )));
        }
        let Some(word) = generic_word(row, &columns) else {
            logs.push(LogEntry::warning(format!(
                "Line {}: the text field is empty and the row was skipped.",
                row.line
            )));
            continue;
        };
        words.push(word, row.line, logs);
    }
    Ok(())
}

fn generic_word(row: &Record, columns: &Columns) -> Option<Word> {
    let cell = |index: usize| {
        row.fields
            .get(index)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_owned)
    };
    let mut word = Word::new(cell(columns.text)?);
    word.answers = columns.answers.iter().filter_map(|&i| cell(i)).collect();
    word.question = columns.question.and_then(cell);
    word.description = columns.description.and_then(cell);
    Some(word)
}

fn read_word_list(text: &str, words: &mut WordSet, logs: &mut Vec<LogEntry>) {
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        words.push(Word::new(line), index + 1, logs);
    }
}

fn read_quiz(text: &str, words: &mut WordSet, logs: &mut Vec<LogEntry>) -> Result<(), ConvertError> {
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut cells = line.split('\t').map(str::trim);
        let question = cells.next().unwrap_or_default();
        let answers: Vec<String> = cells.filter(|c| !c.is_empty()).map(str::to_owned).collect();
        let Some(first) = answers.first() else {
            return Err(ConvertError::syntax(format!(
                "Line {}: a question and an answer separated by a tab are required.",
                index + 1
            )));
        };
        let mut word = Word::new(first.clone());
        if answers.len() > 1 {
            word.answers = answers;
        }
        word.question = Some(question.to_owned()).filter(|q| !q.is_empty());
        words.push(word, index + 1, logs);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::log::Level;

    #[test]
    fn generic_csv_with_optional_columns() {
        let csv = "text,answer,answer,question,description\r\n\
                   猫,ねこ,ネコ,鳴き声は？,ペット\r\n\
                   犬,,,,\r\n";
        let parsed = parse_bytes(csv.as_bytes(), None, "動物.csv", None).unwrap();
        assert!(parsed.logs.is_empty());
        assert_eq!(parsed.value.title, "動物");
        let cat = &parsed.value.words[0];
        assert_eq!(cat.answers, ["ねこ", "ネコ"]);
        assert_eq!(cat.question.as_deref(), Some("鳴き声は？"));
        assert_eq!(parsed.value.words[1], Word::new("犬"));
    }

    #[test]
    fn generic_warns_on_duplicates_and_blank_rows() {
        let csv = "text,answer\ncat,\ncat,\n,neko\ndog,\n";
        let parsed = parse_bytes(csv.as_bytes(), Some("generic"), "x.txt", None).unwrap();
        let levels: Vec<Level> = parsed.logs.iter().map(|l| l.level).collect();
        assert_eq!(levels, [Level::Warning, Level::Warning]);
        assert_eq!(parsed.value.words.len(), 2);
    }

    #[test]
    fn generic_requires_text_column() {
        let err = parse_bytes(b"word\ncat\n", None, "a.csv", None).unwrap_err();
        assert!(matches!(err, ConvertError::Syntax(_)));
    }

    #[test]
    fn generic_rejects_wide_rows() {
        let err = parse_bytes(b"text\ncat,extra\n", None, "a.csv", None).unwrap_err();
        assert_eq!(err.to_string(), "Line 2: the row has 2 fields but the header has 1.");
    }

    #[test]
    fn word_list_skips_comments() {
        let parsed = parse_bytes(b"# animals\ncat\n\n dog \n", None, "a.txt", Some("Pets")).unwrap();
        let texts: Vec<&str> = parsed.value.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["cat", "dog"]);
        assert_eq!(parsed.value.title, "Pets");
    }

    #[test]
    fn quiz_lines_need_an_answer() {
        let parsed = parse_bytes(b"Q1\tA1\tA2\nQ2\tB\n", None, "q.tsv", None).unwrap();
        assert_eq!(parsed.value.words[0].answers, ["A1", "A2"]);
        assert_eq!(parsed.value.words[1].question.as_deref(), Some("Q2"));

        let err = parse_bytes(b"Q1\t\n", Some("quiz"), "q.txt", None).unwrap_err();
        assert!(matches!(err, ConvertError::Syntax(_)));
    }

    #[test]
    fn unknown_source_format_is_a_syntax_error() {
        let err = parse_bytes(b"cat", Some("catchm"), "a.dat", None).unwrap_err();
        assert!(matches!(err, ConvertError::Syntax(_)));
    }

    #[test]
    fn empty_input_is_a_syntax_error() {
        let err = parse_bytes(b"\n# nothing\n", None, "a.txt", None).unwrap_err();
        assert_eq!(err.to_string(), "The dictionary contains no words.");
    }
}
