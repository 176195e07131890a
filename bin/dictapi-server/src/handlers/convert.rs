//! Conversion orchestration.
//!
//! Runs the converter for a validated [`Conversion`], maps its typed
//! failures onto problem kinds and renders the result either as a single
//! attachment or, when diagnostics were produced, as a multipart bundle.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use dictapi_convert::{ConvertError, Converter, LogEntry, OutputFile};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::error::{PROBLEM_JSON, Problem, ProblemKind, pretty_json};
use crate::fault::Fault;
use crate::multipart::{FormData, MultipartError};
use crate::validation::Conversion;

const CONVERT_FAILED: &str = "Failed to convert the file.";

/// Bytes left unescaped in `filename*`: letters, digits and `-_.~`.
const FILENAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// A successful conversion, ready to send.
#[derive(Debug)]
pub struct Rendered {
    content_type: HeaderValue,
    disposition: Option<HeaderValue>,
    body: Vec<u8>,
}

impl Rendered {
    /// The converted file on its own.
    pub fn attachment(file: OutputFile) -> Result<Self, Problem> {
        let content_type = HeaderValue::from_str(&file.mime_type)
            .map_err(|e| Problem::internal(CONVERT_FAILED, Fault::new("convert", format!("invalid MIME type: {e}"))))?;
        let disposition = format!(
            "attachment; filename*=UTF-8''{}",
            utf8_percent_encode(&file.name, FILENAME)
        );
        let disposition = HeaderValue::from_str(&disposition)
            .map_err(|e| Problem::internal(CONVERT_FAILED, Fault::new("convert", e)))?;
        Ok(Self {
            content_type,
            disposition: Some(disposition),
            body: file.bytes,
        })
    }

    /// The converted file followed by the non-empty diagnostic logs.
    pub fn bundle(file: OutputFile, parser_logs: &[LogEntry], serializer_logs: &[LogEntry]) -> Result<Self, Problem> {
        let mut form = FormData::new();
        let encoded = fill(&mut form, file, parser_logs, serializer_logs)
            .and_then(|()| Ok((form.content_type()?, form.encode()?)));
        let (content_type, body) = encoded.map_err(multipart_failed)?;
        let content_type = HeaderValue::from_str(&content_type)
            .map_err(|e| Problem::internal(CONVERT_FAILED, Fault::new("multipart", e)))?;
        Ok(Self {
            content_type,
            disposition: None,
            body,
        })
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Body::from(self.body)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, self.content_type);
        if let Some(disposition) = self.disposition {
            headers.insert(header::CONTENT_DISPOSITION, disposition);
        }
        response
    }
}

#[derive(Serialize)]
struct LogsDocument<'a> {
    logs: &'a [LogEntry],
}

fn fill(
    form: &mut FormData,
    file: OutputFile,
    parser_logs: &[LogEntry],
    serializer_logs: &[LogEntry],
) -> Result<(), MultipartError> {
    form.append("output", file.bytes, Some(&file.name), Some(&file.mime_type))?;
    for (name, logs) in [("parser-logs", parser_logs), ("serializer-logs", serializer_logs)] {
        if !logs.is_empty() {
            form.append(name, pretty_json(&LogsDocument { logs }), None, Some(PROBLEM_JSON))?;
        }
    }
    Ok(())
}

fn multipart_failed(e: MultipartError) -> Problem {
    Problem::internal(CONVERT_FAILED, Fault::new("multipart", e))
}

struct Converted {
    output: OutputFile,
    parser_logs: Vec<LogEntry>,
    serializer_logs: Vec<LogEntry>,
}

/// Parse, serialize and render. Runs the converter on the blocking pool.
pub async fn convert(converter: Arc<dyn Converter>, conversion: Conversion) -> Result<Rendered, Problem> {
    debug!(
        filename = %conversion.filename,
        from = ?conversion.from,
        to = ?conversion.to,
        "converting upload"
    );
    let converted = tokio::task::spawn_blocking(move || run(converter.as_ref(), &conversion))
        .await
        .map_err(join_failed)?
        .map_err(classify)?;

    info!(
        output = %converted.output.name,
        bytes = converted.output.bytes.len(),
        parser_logs = converted.parser_logs.len(),
        serializer_logs = converted.serializer_logs.len(),
        "conversion finished"
    );
    if converted.parser_logs.is_empty() && converted.serializer_logs.is_empty() {
        Rendered::attachment(converted.output)
    } else {
        Rendered::bundle(converted.output, &converted.parser_logs, &converted.serializer_logs)
    }
}

fn run(converter: &dyn Converter, conversion: &Conversion) -> Result<Converted, ConvertError> {
    let parsed = converter.parse(
        &conversion.file,
        conversion.from.as_deref(),
        &conversion.filename,
        conversion.title.as_deref(),
    )?;
    let serialized = converter.serialize(&parsed.value, conversion.to.as_deref())?;
    Ok(Converted {
        output: serialized.value,
        parser_logs: parsed.logs,
        serializer_logs: serialized.logs,
    })
}

fn join_failed(error: JoinError) -> Problem {
    let cause = if error.is_panic() {
        let payload = error.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        format!("converter panicked: {message}")
    } else {
        format!("conversion task failed: {error}")
    };
    Problem::internal(CONVERT_FAILED, Fault::new("convert", cause))
}

fn classify(error: ConvertError) -> Problem {
    match error {
        ConvertError::Syntax(message) => Problem::new(ProblemKind::MalformedSyntax, message),
        ConvertError::Serialize(message) => Problem::new(ProblemKind::SerializeError, message),
        other => Problem::internal(CONVERT_FAILED, Fault::new("convert", other)),
    }
}
