//! Target-format writers.

use tracing::debug;

use crate::csv::write_record;
use crate::dictionary::{Dictionary, OutputFile, Word};
use crate::error::ConvertError;
use crate::format::Format;
use crate::log::{LogEntry, Logged};

/// Render `dictionary` in the requested format (default: [`Format::Generic`]).
pub(crate) fn serialize_dictionary(
    dictionary: &Dictionary,
    to: Option<&str>,
) -> Result<Logged<OutputFile>, ConvertError> {
    let format = match to {
        Some(name) => Format::from_name(name).ok_or_else(|| {
            ConvertError::serialize(format!("\"{name}\" is not a supported target format."))
        })?,
        None => Format::default(),
    };
    debug!(%format, words = dictionary.words.len(), "serializing dictionary");

    let mut logs = Vec::new();
    let body = match format {
        Format::Generic => write_generic(&dictionary.words),
        Format::WordList => write_word_list(&dictionary.words, &mut logs),
        Format::Quiz => write_quiz(&dictionary.words)?,
    };
    let output = OutputFile {
        name: format!("{}.{}", dictionary.title, format.extension()),
        mime_type: format.mime_type().to_owned(),
        bytes: body.into_bytes(),
    };
    Ok(Logged::new(output, logs))
}

fn write_generic(words: &[Word]) -> String {
    let answer_columns = words.iter().map(|w| w.answers.len()).max().unwrap_or(0);
    let has_question = words.iter().any(|w| w.question.is_some());
    let has_description = words.iter().any(|w| w.description.is_some());

    let mut header = vec!["text"];
    header.extend(std::iter::repeat_n("answer", answer_columns));
    if has_question {
        header.push("question");
    }
    if has_description {
        header.push("description");
    }

    let mut out = String::new();
    write_record(&mut out, &header);
    for word in words {
        let mut row: Vec<&str> = Vec::with_capacity(header.len());
        row.push(&word.text);
        row.extend(word.answers.iter().map(String::as_str));
        row.extend(std::iter::repeat_n("", answer_columns - word.answers.len()));
        if has_question {
            row.push(word.question.as_deref().unwrap_or_default());
        }
        if has_description {
            row.push(word.description.as_deref().unwrap_or_default());
        }
        write_record(&mut out, &row);
    }
    out
}

fn write_word_list(words: &[Word], logs: &mut Vec<LogEntry>) -> String {
    if words.iter().any(Word::has_extra_data) {
        logs.push(LogEntry::warning(
            "Answers, questions and descriptions cannot be stored in a word list and were dropped.",
        ));
    }
    let mut out = String::new();
    for word in words {
        out.push_str(&single_line(&word.text));
        out.push('\n');
    }
    out
}

fn write_quiz(words: &[Word]) -> Result<String, ConvertError> {
    let mut out = String::new();
    for word in words {
        let Some(question) = word.question.as_deref() else {
            return Err(ConvertError::serialize(format!(
                "\"{}\" has no question, which the quiz format requires.",
                word.text
            )));
        };
        out.push_str(&single_line(question));
        if word.answers.is_empty() {
            out.push('\t');
            out.push_str(&single_line(&word.text));
        }
        for answer in &word.answers {
            out.push('\t');
            out.push_str(&single_line(answer));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Line-oriented formats cannot hold tabs or line breaks inside a cell.
fn single_line(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}
